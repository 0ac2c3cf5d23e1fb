//! Convergence engine: one pass per declared alias.
//!
//! A pass inspects the keystore, resolves the source, classifies, plans,
//! executes and verifies by inspecting again. Every pass starts from a fresh
//! inspection and failures of one alias never stop the others.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use super::compare::{classify_in, Classification};
use super::executor::Executor;
use super::planner::{plan, plan_removal, Operation, Plan};
use crate::error::{InspectError, ReconcileError, ReconcileWarning, ResolveError};
use crate::infrastructure::keytool::KeytoolCommands;
use crate::infrastructure::ToolRunner;
use crate::resolver::{DesiredEntry, Resolver};
use crate::snapshot::inspector::Inspector;
use crate::snapshot::Snapshot;
use crate::types::{
    CapabilityTable, DesiredSpec, EngineConfig, Ensure, Entry, FormatCapabilities, KeystoreRef, SourceBundle,
};


/// Result of one alias's pass, as reported to the declarative layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Unchanged,
    Changed,
    Failed { error: ReconcileError },
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub alias: String,
    pub keystore: PathBuf,
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Operations that completed, in order.
    pub operations: Vec<Operation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ReconcileWarning>,
}

impl Report {
    pub fn failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }

    pub fn changed(&self) -> bool {
        matches!(self.outcome, Outcome::Changed)
    }

    /// Short status word: `unchanged`, `changed`, `warning` or `failed`. A
    /// pass that planned nothing but left declared state unapplied reads
    /// `warning`.
    pub fn status(&self) -> &'static str {
        match &self.outcome {
            Outcome::Failed { .. } => "failed",
            Outcome::Changed => "changed",
            Outcome::Unchanged if !self.warnings.is_empty() => "warning",
            Outcome::Unchanged => "unchanged",
        }
    }
}


/// What a pass would do, without doing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub alias: String,
    pub keystore: PathBuf,
    pub store_exists: bool,
    /// The entry currently under the alias.
    pub current: Option<Entry>,
    /// `None` for `ensure: absent`.
    pub desired: Option<DesiredEntry>,
    pub classification: Option<Classification>,
    pub plan: Plan,
}


struct Assessed {
    snapshot: Snapshot,
    present_alias: Option<String>,
    desired: Option<DesiredEntry>,
    classification: Option<Classification>,
    plan: Plan,
}


pub struct Engine<R: ToolRunner> {
    runner: R,
    commands: KeytoolCommands,
    capabilities: CapabilityTable,
    missing_markers: Vec<String>,
}

impl<R: ToolRunner> Engine<R> {
    pub fn new(runner: R, config: &EngineConfig) -> Self {
        Engine {
            runner,
            commands: KeytoolCommands::from_config(config),
            capabilities: config.capabilities(),
            missing_markers: config.missing_keystore_markers.clone(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    pub fn inspect(&self, store: &KeystoreRef) -> Result<Snapshot, InspectError> {
        Inspector::new(&self.runner, &self.commands, &self.missing_markers).inspect(store)
    }

    /// Dry run: inspect, resolve, classify and plan without executing.
    pub fn assess(&self, spec: &DesiredSpec) -> Result<Assessment, ReconcileError> {
        let assessed = self.assess_inner(spec)?;
        let current = assessed
            .present_alias
            .as_deref()
            .and_then(|a| assessed.snapshot.entry(a))
            .cloned();
        Ok(Assessment {
            alias: spec.alias.clone(),
            keystore: spec.keystore.path.clone(),
            store_exists: assessed.snapshot.store_exists(),
            current,
            desired: assessed.desired,
            classification: assessed.classification,
            plan: assessed.plan,
        })
    }

    /// Converge one alias.
    pub fn reconcile(&self, spec: &DesiredSpec) -> Report {
        let mut report = Report {
            alias: spec.alias.clone(),
            keystore: spec.keystore.path.clone(),
            outcome: Outcome::Unchanged,
            operations: Vec::new(),
            warnings: Vec::new(),
        };

        let assessed = match self.assess_inner(spec) {
            Ok(assessed) => assessed,
            Err(error) => return fail(report, error),
        };
        report.warnings = assessed.plan.warnings.clone();
        for warning in &report.warnings {
            warn!(alias = %spec.alias, "{}", warning);
        }

        if assessed.plan.is_empty() {
            info!(alias = %spec.alias, keystore = %spec.keystore.path.display(), "unchanged");
            return report;
        }

        let executor = Executor::new(&self.runner, &self.commands);
        match executor.execute(spec, &assessed.plan.operations, assessed.snapshot.store_exists()) {
            Ok(applied) => report.operations = applied,
            Err(error) => {
                if let ReconcileError::OperationFailed { timed_out: true, .. } = &error {
                    self.log_state_after_timeout(spec);
                }
                return fail(report, error);
            }
        }

        if let Err(error) = self.verify(spec, assessed.desired.as_ref()) {
            return fail(report, error);
        }
        info!(
            alias = %spec.alias,
            keystore = %spec.keystore.path.display(),
            steps = report.operations.len(),
            "changed"
        );
        report.outcome = Outcome::Changed;
        report
    }

    /// Converge every alias in order. A failed alias does not stop the rest.
    pub fn reconcile_all(&self, specs: &[DesiredSpec]) -> Vec<Report> {
        specs.iter().map(|spec| self.reconcile(spec)).collect()
    }

    fn assess_inner(&self, spec: &DesiredSpec) -> Result<Assessed, ReconcileError> {
        let caps = self.capabilities.lookup(&spec.keystore.format);
        let snapshot = self
            .inspect(&spec.keystore)
            .map_err(|e| inspection_failed(spec, e))?;
        let present_alias = locate(&snapshot, &spec.alias, caps);

        if spec.ensure == Ensure::Absent {
            let plan = plan_removal(present_alias.as_deref());
            return Ok(Assessed {
                snapshot,
                present_alias,
                desired: None,
                classification: None,
                plan,
            });
        }

        let source = spec.source.as_ref().ok_or_else(|| ReconcileError::SourceUnreadable {
            alias: spec.alias.clone(),
            bundle: PathBuf::new(),
            diagnostic: "no source declared".into(),
        })?;
        let desired = Resolver::new(&self.runner, &self.commands, &self.capabilities)
            .resolve(source)
            .map_err(|e| source_failed(spec, source, e))?;

        let lookup = present_alias.as_deref().unwrap_or(&spec.alias);
        let classification = classify_in(&snapshot, lookup, &desired);
        let plan = plan(spec, classification, present_alias.as_deref(), &desired, caps);
        info!(
            alias = %spec.alias,
            classification = %classification,
            steps = plan.operations.len(),
            "planned"
        );
        Ok(Assessed {
            snapshot,
            present_alias,
            desired: Some(desired),
            classification: Some(classification),
            plan,
        })
    }

    fn verify(&self, spec: &DesiredSpec, desired: Option<&DesiredEntry>) -> Result<(), ReconcileError> {
        let unverified = |detail: String| ReconcileError::ConvergenceVerificationFailed {
            alias: spec.alias.clone(),
            detail,
        };
        let caps = self.capabilities.lookup(&spec.keystore.format);
        let snapshot = self
            .inspect(&spec.keystore)
            .map_err(|e| unverified(format!("re-inspection failed: {}", e)))?;
        let present_alias = locate(&snapshot, &spec.alias, caps);

        match desired {
            None => match present_alias {
                None => Ok(()),
                Some(found) => Err(unverified(format!("alias '{}' still present", found))),
            },
            Some(desired) => {
                let lookup = present_alias.as_deref().unwrap_or(&spec.alias);
                match classify_in(&snapshot, lookup, desired) {
                    Classification::Satisfied => Ok(()),
                    other => Err(unverified(format!(
                        "expected satisfied, found {} (desired chain {})",
                        other, desired.chain
                    ))),
                }
            }
        }
    }

    fn log_state_after_timeout(&self, spec: &DesiredSpec) {
        match self.inspect(&spec.keystore) {
            Ok(snapshot) => warn!(
                alias = %spec.alias,
                keystore = %spec.keystore.path.display(),
                present = snapshot.contains(&spec.alias),
                entries = snapshot.len(),
                "keystore state after timeout"
            ),
            Err(e) => warn!(
                alias = %spec.alias,
                keystore = %spec.keystore.path.display(),
                error = %e,
                "cannot inspect keystore after timeout"
            ),
        }
    }
}


/// The alias as the keystore lists it: exact match first, then the folded
/// spelling for formats that lowercase aliases.
fn locate(snapshot: &Snapshot, alias: &str, caps: FormatCapabilities) -> Option<String> {
    if snapshot.contains(alias) {
        return Some(alias.to_string());
    }
    let folded = caps.fold_alias(alias);
    if snapshot.contains(&folded) {
        Some(folded)
    } else {
        None
    }
}

fn fail(mut report: Report, error: ReconcileError) -> Report {
    warn!(alias = %report.alias, attempted = %error.attempted(), "{}", error);
    report.outcome = Outcome::Failed { error };
    report
}

fn inspection_failed(spec: &DesiredSpec, e: InspectError) -> ReconcileError {
    ReconcileError::InspectionFailed {
        alias: spec.alias.clone(),
        keystore: spec.keystore.path.clone(),
        diagnostic: e.to_string(),
    }
}

fn source_failed(spec: &DesiredSpec, source: &SourceBundle, e: ResolveError) -> ReconcileError {
    let alias = spec.alias.clone();
    let bundle = source.path.clone();
    match e {
        ResolveError::Unreadable(diagnostic) => ReconcileError::SourceUnreadable {
            alias,
            bundle,
            diagnostic,
        },
        ResolveError::AliasNotFound { requested, available } => ReconcileError::SourceAliasNotFound {
            alias,
            source_alias: requested,
            bundle,
            available,
        },
        ResolveError::Ambiguous { candidates } => ReconcileError::AmbiguousSource {
            alias,
            bundle,
            candidates,
        },
    }
}
