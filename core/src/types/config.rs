use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::keystore::StoreFormat;


// ---------------------------------------------------------------------------
// Format capabilities
// ---------------------------------------------------------------------------

/// What keytool can do with a given store format. These differ between Java
/// releases, so every field can be overridden from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatCapabilities {
    /// `keytool -keypasswd` works against this format.
    pub in_place_key_password_change: bool,
    /// A key may carry a password different from the store password
    /// (`-destkeypass` is honored on import).
    pub distinct_key_password: bool,
    /// keytool lowercases aliases stored in this format.
    pub folds_alias_case: bool,
}

impl FormatCapabilities {
    /// Assumed for formats the table does not know: no key password support,
    /// so declared key passwords surface as warnings instead of failing.
    pub const fn conservative() -> Self {
        FormatCapabilities {
            in_place_key_password_change: false,
            distinct_key_password: false,
            folds_alias_case: true,
        }
    }

    /// Apply keytool's alias case folding for this format.
    pub fn fold_alias(&self, alias: &str) -> String {
        if self.folds_alias_case {
            alias.to_lowercase()
        } else {
            alias.to_string()
        }
    }
}

impl Default for FormatCapabilities {
    fn default() -> Self {
        FormatCapabilities::conservative()
    }
}


/// Partial override of a format's capabilities, as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_place_key_password_change: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct_key_password: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folds_alias_case: Option<bool>,
}


/// Capabilities keyed by lowercase format name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityTable {
    formats: BTreeMap<String, FormatCapabilities>,
}

impl CapabilityTable {
    pub fn empty() -> Self {
        CapabilityTable {
            formats: BTreeMap::new(),
        }
    }

    pub fn lookup(&self, format: &StoreFormat) -> FormatCapabilities {
        self.formats
            .get(format.as_str())
            .copied()
            .unwrap_or_else(FormatCapabilities::conservative)
    }

    pub fn set(&mut self, format: &StoreFormat, caps: FormatCapabilities) {
        self.formats.insert(format.as_str().to_string(), caps);
    }

    pub fn apply_override(&mut self, format: &StoreFormat, over: &FormatOverride) {
        let mut caps = self.lookup(format);
        if let Some(v) = over.in_place_key_password_change {
            caps.in_place_key_password_change = v;
        }
        if let Some(v) = over.distinct_key_password {
            caps.distinct_key_password = v;
        }
        if let Some(v) = over.folds_alias_case {
            caps.folds_alias_case = v;
        }
        self.set(format, caps);
    }
}

impl Default for CapabilityTable {
    /// JKS and JCEKS keep per-key passwords and support `-keypasswd`;
    /// keytool rejects both for PKCS12 stores.
    fn default() -> Self {
        let full = FormatCapabilities {
            in_place_key_password_change: true,
            distinct_key_password: true,
            folds_alias_case: true,
        };
        let mut table = CapabilityTable::empty();
        table.set(&StoreFormat::Jks, full);
        table.set(&StoreFormat::Jceks, full);
        table.set(&StoreFormat::Pkcs12, FormatCapabilities::conservative());
        table
    }
}


// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// keytool executable; a bare name is looked up on `PATH`.
    pub keytool: PathBuf,
    /// Upper bound for one keytool invocation.
    pub timeout_ms: u64,
    /// Pass `-J-Duser.language=en -J-Duser.country=US` so listing labels do
    /// not depend on the host locale.
    pub force_english_locale: bool,
    /// Diagnostic fragments meaning "the keystore file does not exist".
    pub missing_keystore_markers: Vec<String>,
    /// Per-format capability overrides, keyed by format name.
    pub formats: BTreeMap<String, FormatOverride>,
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Built-in capability table with this config's overrides applied.
    pub fn capabilities(&self) -> CapabilityTable {
        let mut table = CapabilityTable::default();
        for (name, over) in &self.formats {
            table.apply_override(&StoreFormat::from(name.as_str()), over);
        }
        table
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            keytool: PathBuf::from("keytool"),
            timeout_ms: 120_000,
            force_english_locale: true,
            missing_keystore_markers: vec!["Keystore file does not exist".into()],
            formats: BTreeMap::new(),
        }
    }
}
