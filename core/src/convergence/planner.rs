//! Reconciliation planner: turns a classification into an ordered list of
//! keytool operations.
//!
//! The planner is stateless and runs nothing. A mismatched entry is always
//! deleted and imported again; chains are never edited in place.

use std::fmt;

use serde::Serialize;

use super::compare::Classification;
use crate::error::ReconcileWarning;
use crate::resolver::DesiredEntry;
use crate::types::{DesiredSpec, EntryKind, FormatCapabilities, StoreFormat};


/// One mutating step against the target keystore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Remove the alias, whatever it currently holds.
    Delete { alias: String },
    /// Copy the desired entry from the source under `alias`.
    Import {
        alias: String,
        /// Alias of the entry inside a keystore bundle; `None` for a
        /// certificate file.
        source_alias: Option<String>,
        kind: EntryKind,
        /// The key is written with its own password (`-destkeypass`).
        with_key_password: bool,
    },
    /// Re-encrypt the key from the previous to the declared key password.
    ChangeKeyPassword { alias: String },
}

impl Operation {
    pub fn alias(&self) -> &str {
        match self {
            Operation::Delete { alias }
            | Operation::Import { alias, .. }
            | Operation::ChangeKeyPassword { alias } => alias,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Delete { alias } => write!(f, "delete '{}'", alias),
            Operation::Import {
                alias,
                source_alias: Some(source_alias),
                kind,
                ..
            } => write!(f, "import '{}' from '{}' as {}", alias, source_alias, kind),
            Operation::Import {
                alias,
                source_alias: None,
                kind,
                ..
            } => write!(f, "import '{}' as {}", alias, kind),
            Operation::ChangeKeyPassword { alias } => write!(f, "change key password of '{}'", alias),
        }
    }
}


/// Operations to run in order, plus the warnings found while planning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub operations: Vec<Operation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ReconcileWarning>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn push(&mut self, op: Operation) {
        self.operations.push(op);
    }

    fn warn(&mut self, warning: ReconcileWarning) {
        self.warnings.push(warning);
    }
}


/// Plan the steps that bring `spec.alias` to the desired entry.
///
/// `present_alias` is the alias as the keystore lists it when the entry
/// exists; it differs from `spec.alias` only by case folding.
pub fn plan(
    spec: &DesiredSpec,
    classification: Classification,
    present_alias: Option<&str>,
    desired: &DesiredEntry,
    caps: FormatCapabilities,
) -> Plan {
    let mut plan = Plan::default();
    let format = &spec.keystore.format;

    match classification {
        Classification::Satisfied if desired.kind == EntryKind::PrivateKeyWithChain => {
            if caps.in_place_key_password_change {
                if spec.rotation().is_some() {
                    plan.push(Operation::ChangeKeyPassword {
                        alias: present_alias.unwrap_or(&spec.alias).to_string(),
                    });
                }
            } else if key_password_differs(spec) {
                plan.warn(ReconcileWarning::PasswordChangeUnsupported {
                    alias: spec.alias.clone(),
                    format: format.to_string(),
                });
            }
        }
        Classification::Satisfied => {}
        Classification::Absent => {
            push_import(&mut plan, spec, desired, caps, format);
        }
        Classification::ChainMismatch | Classification::KindMismatch => {
            plan.push(Operation::Delete {
                alias: present_alias.unwrap_or(&spec.alias).to_string(),
            });
            push_import(&mut plan, spec, desired, caps, format);
        }
    }
    plan
}

/// Plan for `ensure: absent`.
pub fn plan_removal(present_alias: Option<&str>) -> Plan {
    let mut plan = Plan::default();
    if let Some(alias) = present_alias {
        plan.push(Operation::Delete {
            alias: alias.to_string(),
        });
    }
    plan
}


/// A declared key password that the key cannot be carrying: it differs from
/// the previous key password when one is declared, else from the store
/// password that formats without in-place change protect the key with.
fn key_password_differs(spec: &DesiredSpec) -> bool {
    match (&spec.key_password, &spec.previous_key_password) {
        (Some(new), Some(old)) => new != old,
        (Some(new), None) => *new != spec.keystore.password,
        (None, _) => false,
    }
}

fn push_import(
    plan: &mut Plan,
    spec: &DesiredSpec,
    desired: &DesiredEntry,
    caps: FormatCapabilities,
    format: &StoreFormat,
) {
    let is_key = desired.kind == EntryKind::PrivateKeyWithChain;
    if is_key && spec.key_password.is_some() && !caps.distinct_key_password {
        plan.warn(ReconcileWarning::DistinctKeyPasswordIgnored {
            alias: spec.alias.clone(),
            format: format.to_string(),
        });
    }
    plan.push(Operation::Import {
        alias: spec.alias.clone(),
        source_alias: desired.source_alias.clone(),
        kind: desired.kind,
        with_key_password: is_key && caps.distinct_key_password,
    });
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CertificateChain, KeystoreRef, SourceBundle};

    fn spec(format: StoreFormat) -> DesiredSpec {
        DesiredSpec::present(
            "leaf_cert",
            KeystoreRef::new("/etc/app.ks", format, "changeit"),
            SourceBundle::pkcs12("/tmp/leaf.p12", "pkcs12pass").with_alias("Leaf Cert"),
        )
    }

    fn desired() -> DesiredEntry {
        DesiredEntry {
            source_alias: Some("leaf cert".into()),
            kind: EntryKind::PrivateKeyWithChain,
            chain: CertificateChain::from_serials(&["5", "4"]),
        }
    }

    fn jks() -> FormatCapabilities {
        FormatCapabilities {
            in_place_key_password_change: true,
            distinct_key_password: true,
            folds_alias_case: true,
        }
    }

    fn import(with_key_password: bool) -> Operation {
        Operation::Import {
            alias: "leaf_cert".into(),
            source_alias: Some("leaf cert".into()),
            kind: EntryKind::PrivateKeyWithChain,
            with_key_password,
        }
    }

    #[test]
    fn satisfied_plans_nothing() {
        let p = plan(&spec(StoreFormat::Jks), Classification::Satisfied, Some("leaf_cert"), &desired(), jks());
        assert!(p.is_empty());
        assert!(p.warnings.is_empty());
    }

    #[test]
    fn absent_plans_single_import() {
        let p = plan(&spec(StoreFormat::Jks), Classification::Absent, None, &desired(), jks());
        assert_eq!(p.operations, vec![import(true)]);
    }

    #[test]
    fn chain_mismatch_plans_delete_then_import() {
        let p = plan(
            &spec(StoreFormat::Jks),
            Classification::ChainMismatch,
            Some("leaf_cert"),
            &desired(),
            jks(),
        );
        assert_eq!(
            p.operations,
            vec![Operation::Delete { alias: "leaf_cert".into() }, import(true)]
        );
    }

    #[test]
    fn kind_mismatch_plans_delete_then_import() {
        let p = plan(
            &spec(StoreFormat::Jks),
            Classification::KindMismatch,
            Some("leaf_cert"),
            &desired(),
            jks(),
        );
        assert_eq!(p.operations.len(), 2);
        assert!(matches!(p.operations[0], Operation::Delete { .. }));
    }

    #[test]
    fn delete_uses_listed_alias() {
        let p = plan(
            &spec(StoreFormat::Jks),
            Classification::ChainMismatch,
            Some("LEAF_CERT"),
            &desired(),
            jks(),
        );
        assert_eq!(p.operations[0], Operation::Delete { alias: "LEAF_CERT".into() });
        assert_eq!(p.operations[1].alias(), "leaf_cert");
    }

    #[test]
    fn rotation_on_capable_format() {
        let s = spec(StoreFormat::Jks)
            .with_key_password("new")
            .with_previous_key_password("old");
        let p = plan(&s, Classification::Satisfied, Some("leaf_cert"), &desired(), jks());
        assert_eq!(
            p.operations,
            vec![Operation::ChangeKeyPassword { alias: "leaf_cert".into() }]
        );
        assert!(p.warnings.is_empty());
    }

    #[test]
    fn rotation_on_incapable_format_warns_without_steps() {
        let s = spec(StoreFormat::Pkcs12)
            .with_key_password("new")
            .with_previous_key_password("old");
        let p = plan(
            &s,
            Classification::Satisfied,
            Some("leaf_cert"),
            &desired(),
            FormatCapabilities::conservative(),
        );
        assert!(p.is_empty());
        assert_eq!(
            p.warnings,
            vec![ReconcileWarning::PasswordChangeUnsupported {
                alias: "leaf_cert".into(),
                format: "pkcs12".into(),
            }]
        );
    }

    #[test]
    fn declared_key_password_on_incapable_format_warns() {
        let s = spec(StoreFormat::Pkcs12).with_key_password("abcdef123456");
        let p = plan(
            &s,
            Classification::Satisfied,
            Some("leaf_cert"),
            &desired(),
            FormatCapabilities::conservative(),
        );
        assert!(p.is_empty());
        assert!(matches!(
            p.warnings.as_slice(),
            [ReconcileWarning::PasswordChangeUnsupported { .. }]
        ));
    }

    #[test]
    fn key_password_equal_to_store_password_is_satisfied() {
        let s = spec(StoreFormat::Pkcs12).with_key_password("changeit");
        let p = plan(
            &s,
            Classification::Satisfied,
            Some("leaf_cert"),
            &desired(),
            FormatCapabilities::conservative(),
        );
        assert!(p.is_empty());
        assert!(p.warnings.is_empty());
    }

    #[test]
    fn declared_key_password_without_previous_is_not_probed_on_capable_format() {
        let s = spec(StoreFormat::Jks).with_key_password("abcdef123456");
        let p = plan(&s, Classification::Satisfied, Some("leaf_cert"), &desired(), jks());
        assert!(p.is_empty());
        assert!(p.warnings.is_empty());
    }

    #[test]
    fn unchanged_key_password_is_not_a_rotation() {
        let s = spec(StoreFormat::Jks)
            .with_key_password("same")
            .with_previous_key_password("same");
        let p = plan(&s, Classification::Satisfied, Some("leaf_cert"), &desired(), jks());
        assert!(p.is_empty());
    }

    #[test]
    fn key_password_ignored_on_incapable_format() {
        let s = spec(StoreFormat::Pkcs12).with_key_password("abcdef123456");
        let p = plan(&s, Classification::Absent, None, &desired(), FormatCapabilities::conservative());
        assert_eq!(p.operations, vec![import(false)]);
        assert!(matches!(
            p.warnings.as_slice(),
            [ReconcileWarning::DistinctKeyPasswordIgnored { .. }]
        ));
    }

    #[test]
    fn trusted_import_never_carries_key_password() {
        let s = spec(StoreFormat::Jks).with_key_password("abcdef123456");
        let trusted = DesiredEntry {
            source_alias: None,
            kind: EntryKind::TrustedCertificate,
            chain: CertificateChain::from_serials(&["3"]),
        };
        let p = plan(&s, Classification::Absent, None, &trusted, jks());
        assert!(matches!(
            &p.operations[0],
            Operation::Import { with_key_password: false, source_alias: None, .. }
        ));
        assert!(p.warnings.is_empty());
    }

    #[test]
    fn removal_plans() {
        assert!(plan_removal(None).is_empty());
        assert_eq!(
            plan_removal(Some("old")).operations,
            vec![Operation::Delete { alias: "old".into() }]
        );
    }

    #[test]
    fn operation_display() {
        assert_eq!(import(true).to_string(), "import 'leaf_cert' from 'leaf cert' as private-key-with-chain");
        assert_eq!(
            Operation::ChangeKeyPassword { alias: "a".into() }.to_string(),
            "change key password of 'a'"
        );
    }

    #[test]
    fn plan_serializes_tagged_operations() {
        let p = plan(&spec(StoreFormat::Jks), Classification::Absent, None, &desired(), jks());
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["operations"][0]["op"], "import");
        assert_eq!(json["operations"][0]["kind"], "private-key-with-chain");
        assert!(json.get("warnings").is_none());
    }
}
