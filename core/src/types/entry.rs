use std::fmt;

use serde::{Deserialize, Serialize};


// ---------------------------------------------------------------------------
// EntryKind
// ---------------------------------------------------------------------------

/// Kind of a keystore entry, as reported on keytool's `Entry type:` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    PrivateKeyWithChain,
    TrustedCertificate,
    SecretKey,
}

impl EntryKind {
    /// Map a keytool entry-type label to a kind. Older keytool releases print
    /// `keyEntry` where newer ones print `PrivateKeyEntry`.
    pub fn from_label(label: &str) -> Option<EntryKind> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("PrivateKeyEntry") || label.eq_ignore_ascii_case("keyEntry") {
            Some(EntryKind::PrivateKeyWithChain)
        } else if label.eq_ignore_ascii_case("trustedCertEntry") {
            Some(EntryKind::TrustedCertificate)
        } else if label.eq_ignore_ascii_case("SecretKeyEntry") {
            Some(EntryKind::SecretKey)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::PrivateKeyWithChain => "private-key-with-chain",
            EntryKind::TrustedCertificate => "trusted-certificate",
            EntryKind::SecretKey => "secret-key",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


// ---------------------------------------------------------------------------
// Certificate
// ---------------------------------------------------------------------------

/// One certificate of a chain, identified by its serial number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Lowercase hex without separators or leading zeros.
    pub serial: String,
    /// The `Owner:` distinguished name, when the listing carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl Certificate {
    pub fn new(serial: &str, subject: Option<&str>) -> Self {
        Certificate {
            serial: normalize_serial(serial),
            subject: subject.map(|s| s.to_string()),
        }
    }
}

/// keytool prints serials as hex; some releases pad with zeros or separate
/// bytes with colons or spaces.
fn normalize_serial(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let trimmed = compact.trim_start_matches('0');
    if trimmed.is_empty() && !compact.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}


// ---------------------------------------------------------------------------
// CertificateChain
// ---------------------------------------------------------------------------

/// Certificates in chain order, leaf first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateChain(Vec<Certificate>);

impl CertificateChain {
    pub fn new(certificates: Vec<Certificate>) -> Self {
        CertificateChain(certificates)
    }

    /// Build a chain from bare serial numbers, leaf first.
    pub fn from_serials(serials: &[&str]) -> Self {
        CertificateChain(serials.iter().map(|s| Certificate::new(s, None)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.0
    }

    pub fn leaf(&self) -> Option<&Certificate> {
        self.0.first()
    }

    pub fn serials(&self) -> Vec<&str> {
        self.0.iter().map(|c| c.serial.as_str()).collect()
    }

    /// Structural identity: same length and the same serial at every position.
    /// Subjects are informational and not compared.
    pub fn same_identity(&self, other: &CertificateChain) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(other.0.iter()).all(|(a, b)| a.serial == b.serial)
    }
}

impl fmt::Display for CertificateChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.serials().join(", "))
    }
}


// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// A named entry of a keystore as reported by keytool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub alias: String,
    pub kind: EntryKind,
    pub chain: CertificateChain,
}
