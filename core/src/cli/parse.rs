use std::path::PathBuf;

use crate::command::{Command, OutputOptions};


/// Parse CLI arguments into a typed Command.
///
/// Arguments are expected WITHOUT the program name (i.e., `args` should
/// be `["apply", "stores.yaml"]`, not `["jksc", "apply", "stores.yaml"]`).
pub fn parse_args(args: &[&str]) -> Result<Command, String> {
    if args.is_empty() {
        return Err("No command specified. Run 'jksc help' for usage.".into());
    }

    match args[0] {
        "apply" => {
            let (file, output) = parse_file_command(args)?;
            Ok(Command::Apply { file, output })
        }
        "plan" => {
            let (file, output) = parse_file_command(args)?;
            Ok(Command::Plan { file, output })
        }
        "inspect" => {
            let (file, output) = parse_file_command(args)?;
            Ok(Command::Inspect { file, output })
        }
        "help" | "--help" | "-h" => parse_help(args),
        _ => Err(format!("Unknown command: '{}'", args[0])),
    }
}


// ---------------------------------------------------------------------------
// Sub-parsers
// ---------------------------------------------------------------------------

/// `jksc <apply|plan|inspect> <file> [--json] [--verbose]`
fn parse_file_command(args: &[&str]) -> Result<(PathBuf, OutputOptions), String> {
    let name = args[0];
    let mut file = None;
    let mut output = OutputOptions::default();

    let rest = &args[1..];
    let mut i = 0;
    while i < rest.len() {
        match rest[i] {
            "--json" => output.json = true,
            "--verbose" | "-v" => output.verbose = true,
            "--file" | "-f" => {
                i += 1;
                file = Some(take_arg(rest, i, rest[i - 1])?);
            }
            flag if flag.starts_with('-') => {
                return Err(format!("Unknown flag for {}: '{}'", name, flag));
            }
            positional if file.is_none() => file = Some(positional.to_string()),
            extra => return Err(format!("Unexpected argument for {}: '{}'", name, extra)),
        }
        i += 1;
    }

    match file {
        Some(file) => Ok((PathBuf::from(file), output)),
        None => Err(format!("Usage: jksc {} <file> [--json] [--verbose]", name)),
    }
}

/// `jksc help [topic]`
fn parse_help(args: &[&str]) -> Result<Command, String> {
    let topic = if args.len() > 1 {
        Some(args[1..].join(" "))
    } else {
        None
    };
    Ok(Command::Help { topic })
}


fn take_arg(args: &[&str], index: usize, flag: &str) -> Result<String, String> {
    if index >= args.len() {
        return Err(format!("{} requires a value", flag));
    }
    Ok(args[index].into())
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
