use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};


// ---------------------------------------------------------------------------
// StoreFormat
// ---------------------------------------------------------------------------

/// Keystore format, as passed to keytool's `-storetype` option.
///
/// Format names are case-insensitive on input and normalized to lowercase,
/// which is also the key used by the capability table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StoreFormat {
    Jks,
    Pkcs12,
    Jceks,
    Other(String),
}

impl StoreFormat {
    pub fn as_str(&self) -> &str {
        match self {
            StoreFormat::Jks => "jks",
            StoreFormat::Pkcs12 => "pkcs12",
            StoreFormat::Jceks => "jceks",
            StoreFormat::Other(name) => name,
        }
    }

    /// The spelling keytool prints and documents for `-storetype`.
    pub fn keytool_name(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }
}

impl From<&str> for StoreFormat {
    fn from(value: &str) -> Self {
        let lower = value.trim().to_ascii_lowercase();
        match lower.as_str() {
            "jks" => StoreFormat::Jks,
            "pkcs12" | "p12" | "pfx" => StoreFormat::Pkcs12,
            "jceks" => StoreFormat::Jceks,
            _ => StoreFormat::Other(lower),
        }
    }
}

impl From<String> for StoreFormat {
    fn from(value: String) -> Self {
        StoreFormat::from(value.as_str())
    }
}

impl From<StoreFormat> for String {
    fn from(value: StoreFormat) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for StoreFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


// ---------------------------------------------------------------------------
// Secret
// ---------------------------------------------------------------------------

/// A password. Never printed by `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// The clear-text value, for handing to the external tool.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Secret::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Secret(value)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(******)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("******")
    }
}


// ---------------------------------------------------------------------------
// KeystoreRef
// ---------------------------------------------------------------------------

/// The keystore being converged: file path, format and store password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeystoreRef {
    pub path: PathBuf,
    pub format: StoreFormat,
    pub password: Secret,
}

impl KeystoreRef {
    pub fn new(path: impl Into<PathBuf>, format: StoreFormat, password: impl Into<Secret>) -> Self {
        KeystoreRef {
            path: path.into(),
            format,
            password: password.into(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_are_case_insensitive() {
        assert_eq!(StoreFormat::from("PKCS12"), StoreFormat::Pkcs12);
        assert_eq!(StoreFormat::from("Jks"), StoreFormat::Jks);
        assert_eq!(StoreFormat::from("p12"), StoreFormat::Pkcs12);
        assert_eq!(StoreFormat::from("BKS"), StoreFormat::Other("bks".into()));
    }

    #[test]
    fn keytool_name_is_uppercase() {
        assert_eq!(StoreFormat::Pkcs12.keytool_name(), "PKCS12");
        assert_eq!(StoreFormat::Other("bks".into()).keytool_name(), "BKS");
    }

    #[test]
    fn format_serde_uses_lowercase_name() {
        let json = serde_json::to_string(&StoreFormat::Jceks).unwrap();
        assert_eq!(json, "\"jceks\"");
        let back: StoreFormat = serde_json::from_str("\"PKCS12\"").unwrap();
        assert_eq!(back, StoreFormat::Pkcs12);
    }

    #[test]
    fn secret_is_redacted() {
        let secret = Secret::new("puppet");
        assert_eq!(format!("{:?}", secret), "Secret(******)");
        assert_eq!(secret.to_string(), "******");
        assert_eq!(secret.expose(), "puppet");
    }
}
