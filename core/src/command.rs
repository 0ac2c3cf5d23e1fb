//! Command: the typed interface for every `jksc` operation.
//!
//! | Command | Effect |
//! |---------|--------|
//! | `apply <file>` | Converge every entry of the file |
//! | `plan <file>` | Show what `apply` would do, without doing it |
//! | `inspect <file>` | List the current entries of every keystore in the file |
//! | `help [topic]` | Usage text |

use std::path::PathBuf;

use serde::{Deserialize, Serialize};


/// How results are printed and how much is logged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputOptions {
    /// Print the report as JSON instead of text.
    #[serde(default)]
    pub json: bool,
    /// Log at debug level, including every keytool invocation.
    #[serde(default)]
    pub verbose: bool,
}


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Apply {
        file: PathBuf,
        #[serde(default)]
        output: OutputOptions,
    },
    Plan {
        file: PathBuf,
        #[serde(default)]
        output: OutputOptions,
    },
    Inspect {
        file: PathBuf,
        #[serde(default)]
        output: OutputOptions,
    },
    Help {
        topic: Option<String>,
    },
}

impl Command {
    /// The convergence file, for commands that read one.
    pub fn file(&self) -> Option<&PathBuf> {
        match self {
            Command::Apply { file, .. } | Command::Plan { file, .. } | Command::Inspect { file, .. } => Some(file),
            Command::Help { .. } => None,
        }
    }

    pub fn output(&self) -> OutputOptions {
        match self {
            Command::Apply { output, .. } | Command::Plan { output, .. } | Command::Inspect { output, .. } => *output,
            Command::Help { .. } => OutputOptions::default(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_command_tag() {
        let cmd = Command::Plan {
            file: PathBuf::from("stores.yaml"),
            output: OutputOptions { json: true, verbose: false },
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["command"], "plan");
        assert_eq!(json["file"], "stores.yaml");
        assert_eq!(json["output"]["json"], true);
    }

    #[test]
    fn deserializes_with_defaults() {
        let cmd: Command = serde_json::from_str(r#"{"command":"apply","file":"a.yaml"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Apply {
                file: PathBuf::from("a.yaml"),
                output: OutputOptions::default(),
            }
        );
        assert_eq!(cmd.file(), Some(&PathBuf::from("a.yaml")));
    }

    #[test]
    fn help_has_no_file() {
        let cmd = Command::Help { topic: None };
        assert!(cmd.file().is_none());
        assert!(!cmd.output().json);
    }
}
