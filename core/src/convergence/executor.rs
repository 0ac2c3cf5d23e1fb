//! Operation executor: runs a plan against the target keystore, stopping at
//! the first failed step.
//!
//! No step is retried. A caller that wants to try again runs a new pass,
//! which starts from a fresh inspection.

use tracing::{debug, info};

use super::planner::Operation;
use crate::error::{InvokeError, ReconcileError};
use crate::infrastructure::keytool::{KeystoreImport, KeytoolCommands};
use crate::infrastructure::{Invocation, ToolRunner};
use crate::types::{DesiredSpec, SourceBundle, SourceKind};


pub struct Executor<'a, R: ToolRunner> {
    runner: &'a R,
    commands: &'a KeytoolCommands,
}

impl<'a, R: ToolRunner> Executor<'a, R> {
    pub fn new(runner: &'a R, commands: &'a KeytoolCommands) -> Self {
        Executor { runner, commands }
    }

    /// Apply `operations` in order for `spec`. `store_exists` tells whether
    /// the keystore file was present at inspection time; keytool asks for the
    /// new store password twice when an import creates the file.
    ///
    /// Returns the operations that completed.
    pub fn execute(
        &self,
        spec: &DesiredSpec,
        operations: &[Operation],
        mut store_exists: bool,
    ) -> Result<Vec<Operation>, ReconcileError> {
        let mut applied = Vec::with_capacity(operations.len());
        for op in operations {
            let invocation = self.invocation(spec, op, store_exists)?;
            info!(alias = %spec.alias, step = %op, "applying");
            debug!(command = %invocation, "keytool");
            self.run_step(spec, op, &invocation)?;
            if matches!(op, Operation::Import { .. }) {
                store_exists = true;
            }
            applied.push(op.clone());
        }
        Ok(applied)
    }

    fn invocation(
        &self,
        spec: &DesiredSpec,
        op: &Operation,
        store_exists: bool,
    ) -> Result<Invocation, ReconcileError> {
        let store = &spec.keystore;
        match op {
            Operation::Delete { alias } => Ok(self.commands.delete(store, alias)),
            Operation::Import {
                alias,
                source_alias,
                with_key_password,
                ..
            } => {
                let source = source_of(spec, op)?;
                match (&source.kind, source_alias) {
                    (SourceKind::Certificate, _) => {
                        Ok(self.commands.import_cert(store, store_exists, alias, &source.path))
                    }
                    (SourceKind::Keystore(format), Some(source_alias)) => {
                        let key_password = if *with_key_password {
                            Some(spec.key_password.as_ref().unwrap_or(&store.password))
                        } else {
                            None
                        };
                        Ok(self.commands.import_keystore(&KeystoreImport {
                            store,
                            store_exists,
                            alias,
                            source_path: &source.path,
                            source_format: format,
                            source_password: source.password.as_ref(),
                            source_alias,
                            key_password,
                        }))
                    }
                    (SourceKind::Keystore(_), None) => Err(not_runnable(spec, op, "no source alias resolved")),
                }
            }
            Operation::ChangeKeyPassword { alias } => match spec.rotation() {
                Some((old, new)) => Ok(self.commands.change_key_password(store, alias, old, new)),
                None => Err(not_runnable(spec, op, "no key password rotation declared")),
            },
        }
    }

    fn run_step(&self, spec: &DesiredSpec, op: &Operation, invocation: &Invocation) -> Result<(), ReconcileError> {
        let failure = |exit_code, stderr, timed_out| ReconcileError::OperationFailed {
            alias: spec.alias.clone(),
            step: op.clone(),
            exit_code,
            stderr,
            timed_out,
        };
        match self.runner.run(invocation) {
            Ok(output) if output.success() => Ok(()),
            Ok(output) => Err(failure(output.exit_code, output.diagnostic(), false)),
            Err(InvokeError::TimedOut { stdout, stderr, .. }) => {
                let diagnostic = if stderr.trim().is_empty() { stdout } else { stderr };
                Err(failure(None, diagnostic.trim().to_string(), true))
            }
            Err(e) => Err(failure(None, e.to_string(), false)),
        }
    }
}


fn source_of<'s>(spec: &'s DesiredSpec, op: &Operation) -> Result<&'s SourceBundle, ReconcileError> {
    spec.source
        .as_ref()
        .ok_or_else(|| not_runnable(spec, op, "no source declared"))
}

fn not_runnable(spec: &DesiredSpec, op: &Operation, reason: &str) -> ReconcileError {
    ReconcileError::OperationFailed {
        alias: spec.alias.clone(),
        step: op.clone(),
        exit_code: None,
        stderr: reason.to_string(),
        timed_out: false,
    }
}
