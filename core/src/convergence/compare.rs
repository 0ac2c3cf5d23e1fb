//! Chain comparator: classifies the current entry against the desired one.
//!
//! Comparison is purely structural: entry kind, chain length and the serial
//! number at each position. Key passwords are never probed; a matching chain
//! is `Satisfied` whatever password the key carries.

use std::fmt;

use serde::Serialize;

use crate::resolver::DesiredEntry;
use crate::snapshot::Snapshot;
use crate::types::Entry;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The alias is not in the keystore.
    Absent,
    /// Same kind and same chain, position by position.
    Satisfied,
    /// Present, but chain length, order or a serial number differs.
    ChainMismatch,
    /// Present with a different entry kind.
    KindMismatch,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Absent => "absent",
            Classification::Satisfied => "satisfied",
            Classification::ChainMismatch => "chain_mismatch",
            Classification::KindMismatch => "kind_mismatch",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// Classify a parsed entry (or its absence) against the desired entry.
pub fn classify(current: Option<&Entry>, desired: &DesiredEntry) -> Classification {
    match current {
        None => Classification::Absent,
        Some(entry) if entry.kind != desired.kind => Classification::KindMismatch,
        Some(entry) if entry.chain.same_identity(&desired.chain) => Classification::Satisfied,
        Some(_) => Classification::ChainMismatch,
    }
}

/// Classify the alias as found in a snapshot. An alias whose entry keytool
/// listed but that could not be parsed is treated as a chain mismatch.
pub fn classify_in(snapshot: &Snapshot, alias: &str, desired: &DesiredEntry) -> Classification {
    match snapshot.entry(alias) {
        Some(entry) => classify(Some(entry), desired),
        None if snapshot.is_malformed(alias) => Classification::ChainMismatch,
        None => Classification::Absent,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::listing::parse_listing;
    use crate::types::{CertificateChain, EntryKind};

    fn desired(serials: &[&str]) -> DesiredEntry {
        DesiredEntry {
            source_alias: Some("leaf cert".into()),
            kind: EntryKind::PrivateKeyWithChain,
            chain: CertificateChain::from_serials(serials),
        }
    }

    fn key_entry(serials: &[&str]) -> Entry {
        Entry {
            alias: "leaf_cert".into(),
            kind: EntryKind::PrivateKeyWithChain,
            chain: CertificateChain::from_serials(serials),
        }
    }

    #[test]
    fn absent_when_no_entry() {
        assert_eq!(classify(None, &desired(&["5"])), Classification::Absent);
    }

    #[test]
    fn satisfied_when_chain_matches() {
        let current = key_entry(&["5", "4", "3"]);
        assert_eq!(
            classify(Some(&current), &desired(&["5", "4", "3"])),
            Classification::Satisfied
        );
    }

    #[test]
    fn reversed_order_is_mismatch() {
        let current = key_entry(&["5", "4", "3"]);
        assert_eq!(
            classify(Some(&current), &desired(&["3", "4", "5"])),
            Classification::ChainMismatch
        );
    }

    #[test]
    fn shorter_chain_with_same_leaf_is_mismatch() {
        let current = key_entry(&["5", "4", "3"]);
        assert_eq!(
            classify(Some(&current), &desired(&["5", "4"])),
            Classification::ChainMismatch
        );
    }

    #[test]
    fn different_serial_is_mismatch() {
        let current = key_entry(&["5", "6"]);
        assert_eq!(
            classify(Some(&current), &desired(&["5", "4"])),
            Classification::ChainMismatch
        );
    }

    #[test]
    fn kind_difference_wins_over_chain() {
        let current = Entry {
            alias: "leaf_cert".into(),
            kind: EntryKind::TrustedCertificate,
            chain: CertificateChain::from_serials(&["5"]),
        };
        assert_eq!(classify(Some(&current), &desired(&["5"])), Classification::KindMismatch);
    }

    #[test]
    fn malformed_alias_in_snapshot_is_mismatch() {
        let snap = parse_listing(
            "Your keystore contains 1 entry\n\nAlias name: leaf_cert\nEntry type: PrivateKeyEntry\n",
        )
        .unwrap();
        assert_eq!(classify_in(&snap, "leaf_cert", &desired(&["5"])), Classification::ChainMismatch);
        assert_eq!(classify_in(&snap, "other", &desired(&["5"])), Classification::Absent);
    }

    #[test]
    fn classification_serializes_snake_case() {
        let json = serde_json::to_string(&Classification::ChainMismatch).unwrap();
        assert_eq!(json, "\"chain_mismatch\"");
    }
}
