//! Text rendering of engine results for the terminal.

use std::fmt::Write;
use std::path::Path;

use jks_converge_core::snapshot::Snapshot;
use jks_converge_core::{Assessment, Outcome, ReconcileError, Report};


/// One line per alias, followed by its warnings and failure.
pub fn apply_text(reports: &[Report]) -> String {
    let mut out = String::new();
    for report in reports {
        let _ = write!(out, "{:<9} {} in {}", report.status(), report.alias, report.keystore.display());
        if !report.operations.is_empty() {
            let steps: Vec<String> = report.operations.iter().map(|op| op.to_string()).collect();
            let _ = write!(out, ": {}", steps.join(", "));
        }
        out.push('\n');
        for warning in &report.warnings {
            let _ = writeln!(out, "  warning: {}", warning);
        }
        if let Outcome::Failed { error } = &report.outcome {
            let _ = writeln!(out, "  error: {}", error);
        }
    }
    out.push_str(&summary(reports));
    out
}

fn summary(reports: &[Report]) -> String {
    let count = |status: &str| reports.iter().filter(|r| r.status() == status).count();
    format!(
        "{} entries: {} changed, {} unchanged, {} with warnings, {} failed\n",
        reports.len(),
        count("changed"),
        count("unchanged"),
        reports.iter().filter(|r| !r.warnings.is_empty()).count(),
        count("failed"),
    )
}


/// Planned operations per alias, or the error that stopped planning.
pub fn plan_text(results: &[(String, Result<Assessment, ReconcileError>)]) -> String {
    let mut out = String::new();
    for (alias, result) in results {
        match result {
            Ok(a) => {
                let classification = a
                    .classification
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| if a.current.is_some() { "present" } else { "absent" }.to_string());
                let _ = writeln!(out, "{} in {} ({})", alias, a.keystore.display(), classification);
                if let Some(current) = &a.current {
                    let _ = writeln!(out, "  current: {} {}", current.kind, current.chain);
                }
                if let Some(desired) = &a.desired {
                    let _ = writeln!(out, "  desired: {} {}", desired.kind, desired.chain);
                }
                if a.plan.is_empty() {
                    out.push_str("  nothing to do\n");
                }
                for op in &a.plan.operations {
                    let _ = writeln!(out, "  - {}", op);
                }
                for warning in &a.plan.warnings {
                    let _ = writeln!(out, "  warning: {}", warning);
                }
            }
            Err(e) => {
                let _ = writeln!(out, "{}: cannot plan\n  error: {}", alias, e);
            }
        }
    }
    out
}


/// Entries of one keystore.
pub fn snapshot_text(path: &Path, snapshot: &Snapshot) -> String {
    let mut out = String::new();
    if !snapshot.store_exists() {
        let _ = writeln!(out, "{}: does not exist", path.display());
        return out;
    }
    let _ = writeln!(out, "{}: {} entries", path.display(), snapshot.len());
    for entry in snapshot.entries() {
        let _ = writeln!(out, "  {} ({}) {}", entry.alias, entry.kind, entry.chain);
    }
    for bad in snapshot.malformed() {
        let _ = writeln!(
            out,
            "  {} (unreadable: {})",
            bad.alias.as_deref().unwrap_or("?"),
            bad.reason
        );
    }
    out
}
