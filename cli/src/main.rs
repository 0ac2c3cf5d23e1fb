//! jksc: the command-line entry point for keystore convergence.
//!
//! # Usage
//!
//! ```text
//! jksc apply stores.yaml
//! jksc plan stores.yaml --json
//! jksc inspect stores.yaml
//! jksc help file
//! ```

mod config;
mod report;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use jks_converge_core::cli::parse_args;
use jks_converge_core::command::{Command, OutputOptions};
use jks_converge_core::help::help_text;
use jks_converge_core::infrastructure::runner::ProcessRunner;
use jks_converge_core::snapshot::Snapshot;
use jks_converge_core::types::{DesiredSpec, KeystoreRef};
use jks_converge_core::{Assessment, Engine, ReconcileError};


fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    let cmd = match parse_args(&arg_refs) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("jksc: {}", e);
            process::exit(2);
        }
    };

    if let Command::Help { topic } = &cmd {
        println!("{}", help_text(topic.as_deref()));
        return;
    }

    let output = cmd.output();
    init_logging(output.verbose);

    let file = match cmd.file() {
        Some(file) => file.clone(),
        None => return,
    };
    let convergence = match config::load(&file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("jksc: {}", e);
            process::exit(2);
        }
    };
    debug!(
        file = %file.display(),
        entries = convergence.specs.len(),
        keytool = %convergence.engine.keytool.display(),
        "loaded convergence file"
    );

    let runner = ProcessRunner::new(convergence.engine.timeout());
    let engine = Engine::new(runner, &convergence.engine);
    let specs = &convergence.specs;

    let code = match cmd {
        Command::Apply { .. } => apply(&engine, specs, output),
        Command::Plan { .. } => plan(&engine, specs, output),
        Command::Inspect { .. } => inspect(&engine, specs, output),
        Command::Help { .. } => 0,
    };
    process::exit(code);
}


fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}


// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn apply(engine: &Engine<ProcessRunner>, specs: &[DesiredSpec], output: OutputOptions) -> i32 {
    let reports = engine.reconcile_all(specs);
    if output.json {
        print_json(&reports);
    } else {
        print!("{}", report::apply_text(&reports));
    }
    if reports.iter().any(|r| r.failed()) {
        1
    } else {
        0
    }
}

fn plan(engine: &Engine<ProcessRunner>, specs: &[DesiredSpec], output: OutputOptions) -> i32 {
    let results: Vec<_> = specs
        .iter()
        .map(|spec| (spec.alias.clone(), engine.assess(spec)))
        .collect();
    let failed = results.iter().any(|(_, r)| r.is_err());

    if output.json {
        #[derive(Serialize)]
        #[serde(untagged)]
        enum Planned<'a> {
            Assessed(&'a Assessment),
            Failed { alias: &'a str, error: &'a ReconcileError },
        }
        let planned: Vec<Planned<'_>> = results
            .iter()
            .map(|(alias, r)| match r {
                Ok(a) => Planned::Assessed(a),
                Err(error) => Planned::Failed { alias, error },
            })
            .collect();
        print_json(&planned);
    } else {
        print!("{}", report::plan_text(&results));
    }
    if failed {
        1
    } else {
        0
    }
}

fn inspect(engine: &Engine<ProcessRunner>, specs: &[DesiredSpec], output: OutputOptions) -> i32 {
    let mut stores: BTreeMap<PathBuf, &KeystoreRef> = BTreeMap::new();
    for spec in specs {
        stores.entry(spec.keystore.path.clone()).or_insert(&spec.keystore);
    }

    let mut failed = false;
    let mut snapshots: BTreeMap<String, Snapshot> = BTreeMap::new();
    for (path, store) in &stores {
        match engine.inspect(store) {
            Ok(snapshot) => {
                if !output.json {
                    print!("{}", report::snapshot_text(path, &snapshot));
                }
                snapshots.insert(path.display().to_string(), snapshot);
            }
            Err(e) => {
                eprintln!("jksc: cannot inspect {}: {}", path.display(), e);
                failed = true;
            }
        }
    }
    if output.json {
        print_json(&snapshots);
    }
    if failed {
        1
    } else {
        0
    }
}


fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("jksc: cannot encode report: {}", e),
    }
}
