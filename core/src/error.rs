//! Error and warning types for every stage of a convergence pass.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::convergence::planner::Operation;


fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}


fn describe_failure(code: &Option<i32>, timed_out: &bool) -> String {
    if *timed_out {
        format!("{}, timed out", describe_exit(code))
    } else {
        describe_exit(code)
    }
}


// ---------------------------------------------------------------------------
// Process boundary
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("cannot start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} timed out after {}ms", .after.as_millis())]
    TimedOut {
        program: String,
        after: Duration,
        stdout: String,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}


// ---------------------------------------------------------------------------
// Listing parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("output is not a keytool verbose listing")]
    Unrecognized,

    #[error("listing reports {reported} entries but {found} were found")]
    CountMismatch { reported: usize, found: usize },
}


// ---------------------------------------------------------------------------
// Inspection and resolution
// ---------------------------------------------------------------------------

/// Failure to read a keystore or bundle through keytool.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error("keytool failed ({}): {diagnostic}", describe_exit(.exit_code))]
    Tool {
        exit_code: Option<i32>,
        diagnostic: String,
    },

    #[error("unparsable listing: {0}")]
    Listing(#[from] ListingError),
}

/// Failure to resolve the desired entry from a source bundle.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{0}")]
    Unreadable(String),

    #[error("alias '{requested}' not found (bundle holds: {})", .available.join(", "))]
    AliasNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error("bundle holds several candidate entries ({}); declare a source alias", .candidates.join(", "))]
    Ambiguous { candidates: Vec<String> },
}

impl From<InvokeError> for ResolveError {
    fn from(e: InvokeError) -> Self {
        ResolveError::Unreadable(e.to_string())
    }
}

impl From<ListingError> for ResolveError {
    fn from(e: ListingError) -> Self {
        ResolveError::Unreadable(format!("unparsable listing: {}", e))
    }
}


// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

/// A terminal failure of one alias's convergence pass. Every variant carries
/// the alias and the raw keytool diagnostic when one exists.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcileError {
    #[error("{alias}: cannot inspect keystore {}: {diagnostic}", .keystore.display())]
    InspectionFailed {
        alias: String,
        keystore: PathBuf,
        diagnostic: String,
    },

    #[error("{alias}: cannot read source {}: {diagnostic}", .bundle.display())]
    SourceUnreadable {
        alias: String,
        bundle: PathBuf,
        diagnostic: String,
    },

    #[error("{alias}: source alias '{source_alias}' not found in {} (available: {})", .bundle.display(), .available.join(", "))]
    SourceAliasNotFound {
        alias: String,
        source_alias: String,
        bundle: PathBuf,
        available: Vec<String>,
    },

    #[error("{alias}: source {} holds several entries ({}); declare a source alias", .bundle.display(), .candidates.join(", "))]
    AmbiguousSource {
        alias: String,
        bundle: PathBuf,
        candidates: Vec<String>,
    },

    #[error("{alias}: {step} failed ({}): {stderr}", describe_failure(.exit_code, .timed_out))]
    OperationFailed {
        alias: String,
        step: Operation,
        exit_code: Option<i32>,
        stderr: String,
        timed_out: bool,
    },

    #[error("{alias}: keystore did not converge: {detail}")]
    ConvergenceVerificationFailed { alias: String, detail: String },
}

impl ReconcileError {
    pub fn alias(&self) -> &str {
        match self {
            ReconcileError::InspectionFailed { alias, .. }
            | ReconcileError::SourceUnreadable { alias, .. }
            | ReconcileError::SourceAliasNotFound { alias, .. }
            | ReconcileError::AmbiguousSource { alias, .. }
            | ReconcileError::OperationFailed { alias, .. }
            | ReconcileError::ConvergenceVerificationFailed { alias, .. } => alias,
        }
    }

    /// The operation that was being attempted when the pass failed.
    pub fn attempted(&self) -> String {
        match self {
            ReconcileError::InspectionFailed { .. } => "inspect keystore".into(),
            ReconcileError::SourceUnreadable { .. }
            | ReconcileError::SourceAliasNotFound { .. }
            | ReconcileError::AmbiguousSource { .. } => "resolve source".into(),
            ReconcileError::OperationFailed { step, .. } => step.to_string(),
            ReconcileError::ConvergenceVerificationFailed { .. } => "verify convergence".into(),
        }
    }
}


// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Non-fatal conditions: the pass completes, but part of the declared state
/// could not be applied or verified.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcileWarning {
    #[error("{alias}: {format} keystores cannot change a key password in place; declared key password not applied")]
    PasswordChangeUnsupported { alias: String, format: String },

    #[error("{alias}: {format} keystores keep the key under the store password; declared key password ignored on import")]
    DistinctKeyPasswordIgnored { alias: String, format: String },
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_failure_message_carries_diagnostic() {
        let err = ReconcileError::OperationFailed {
            alias: "leaf_cert".into(),
            step: Operation::Delete {
                alias: "leaf_cert".into(),
            },
            exit_code: Some(1),
            stderr: "keytool error: java.io.IOException: keystore password was incorrect".into(),
            timed_out: false,
        };
        let text = err.to_string();
        assert!(text.starts_with("leaf_cert: delete 'leaf_cert' failed (exit code 1)"));
        assert!(text.contains("password was incorrect"));
        assert_eq!(err.alias(), "leaf_cert");
        assert_eq!(err.attempted(), "delete 'leaf_cert'");
    }

    #[test]
    fn timed_out_failure_is_marked() {
        let err = ReconcileError::OperationFailed {
            alias: "a".into(),
            step: Operation::Delete { alias: "a".into() },
            exit_code: None,
            stderr: String::new(),
            timed_out: true,
        };
        assert!(err.to_string().contains("no exit code, timed out"));
    }

    #[test]
    fn alias_not_found_lists_available() {
        let err = ReconcileError::SourceAliasNotFound {
            alias: "leaf_cert".into(),
            source_alias: "missing".into(),
            bundle: PathBuf::from("/tmp/leaf.p12"),
            available: vec!["leaf cert".into()],
        };
        assert!(err.to_string().contains("available: leaf cert"));
        assert_eq!(err.attempted(), "resolve source");
    }

    #[test]
    fn errors_serialize_with_kind_tag() {
        let err = ReconcileError::ConvergenceVerificationFailed {
            alias: "a".into(),
            detail: "chain mismatch".into(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "convergence_verification_failed");
        assert_eq!(json["alias"], "a");
    }

    #[test]
    fn inspect_error_reports_exit_code() {
        let err = InspectError::Tool {
            exit_code: Some(1),
            diagnostic: "keytool error: boom".into(),
        };
        assert_eq!(err.to_string(), "keytool failed (exit code 1): keytool error: boom");
    }
}
