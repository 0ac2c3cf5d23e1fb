//! Desired state declared by the caller for one alias.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::keystore::{KeystoreRef, Secret, StoreFormat};


/// Whether the alias should exist in the keystore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}


/// What the source file holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// A keystore bundle (typically PKCS12) listable with `keytool -list`.
    Keystore(StoreFormat),
    /// A single PEM or DER certificate, imported as a trusted certificate.
    Certificate,
}


/// Where the desired entry comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBundle {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub password: Option<Secret>,
    /// Entry to take from a multi-entry bundle.
    pub alias: Option<String>,
}

impl SourceBundle {
    pub fn keystore(path: impl Into<PathBuf>, format: StoreFormat, password: impl Into<Secret>) -> Self {
        SourceBundle {
            path: path.into(),
            kind: SourceKind::Keystore(format),
            password: Some(password.into()),
            alias: None,
        }
    }

    pub fn pkcs12(path: impl Into<PathBuf>, password: impl Into<Secret>) -> Self {
        SourceBundle::keystore(path, StoreFormat::Pkcs12, password)
    }

    pub fn certificate(path: impl Into<PathBuf>) -> Self {
        SourceBundle {
            path: path.into(),
            kind: SourceKind::Certificate,
            password: None,
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}


/// The caller's declared intent for one alias of one keystore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredSpec {
    pub alias: String,
    pub ensure: Ensure,
    pub keystore: KeystoreRef,
    /// Required when `ensure` is `Present`.
    pub source: Option<SourceBundle>,
    /// Password the private key should carry (`-destkeypass`).
    pub key_password: Option<Secret>,
    /// The key's current password. Declaring one that differs from
    /// `key_password` requests an explicit in-place rotation.
    pub previous_key_password: Option<Secret>,
}

impl DesiredSpec {
    pub fn present(alias: impl Into<String>, keystore: KeystoreRef, source: SourceBundle) -> Self {
        DesiredSpec {
            alias: alias.into(),
            ensure: Ensure::Present,
            keystore,
            source: Some(source),
            key_password: None,
            previous_key_password: None,
        }
    }

    pub fn absent(alias: impl Into<String>, keystore: KeystoreRef) -> Self {
        DesiredSpec {
            alias: alias.into(),
            ensure: Ensure::Absent,
            keystore,
            source: None,
            key_password: None,
            previous_key_password: None,
        }
    }

    pub fn with_key_password(mut self, password: impl Into<Secret>) -> Self {
        self.key_password = Some(password.into());
        self
    }

    pub fn with_previous_key_password(mut self, password: impl Into<Secret>) -> Self {
        self.previous_key_password = Some(password.into());
        self
    }

    /// `(old, new)` when the caller declared a key password that differs from
    /// the one the key currently carries.
    pub fn rotation(&self) -> Option<(&Secret, &Secret)> {
        match (&self.previous_key_password, &self.key_password) {
            (Some(old), Some(new)) if old != new => Some((old, new)),
            _ => None,
        }
    }
}
