//! Point-in-time view of a keystore's entries.
//!
//! `listing` turns keytool's verbose report into a `Snapshot`; `inspector`
//! runs keytool to obtain that report. A snapshot is never updated after a
//! mutating operation: callers inspect again.

pub mod inspector;
pub mod listing;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::Entry;


/// An entry keytool listed but that could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedEntry {
    pub alias: Option<String>,
    pub reason: String,
}


/// Alias → entry, as reported by keytool at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    store_exists: bool,
    entries: BTreeMap<String, Entry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    malformed: Vec<MalformedEntry>,
}

impl Snapshot {
    /// The keystore file does not exist yet.
    pub fn missing() -> Self {
        Snapshot {
            store_exists: false,
            entries: BTreeMap::new(),
            malformed: Vec::new(),
        }
    }

    pub(crate) fn from_parts(entries: Vec<Entry>, malformed: Vec<MalformedEntry>) -> Self {
        Snapshot {
            store_exists: true,
            entries: entries.into_iter().map(|e| (e.alias.clone(), e)).collect(),
            malformed,
        }
    }

    pub fn store_exists(&self) -> bool {
        self.store_exists
    }

    /// The parsed entry under exactly this alias.
    pub fn entry(&self, alias: &str) -> Option<&Entry> {
        self.entries.get(alias)
    }

    /// The alias was listed but its entry could not be parsed.
    pub fn is_malformed(&self, alias: &str) -> bool {
        self.malformed
            .iter()
            .any(|m| m.alias.as_deref() == Some(alias))
    }

    /// The alias exists in the keystore, parsed or not.
    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias) || self.is_malformed(alias)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn malformed(&self) -> &[MalformedEntry] {
        &self.malformed
    }

    /// Number of parsed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.malformed.is_empty()
    }
}
