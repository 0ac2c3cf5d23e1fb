//! keytool command builder.
//!
//! `KeytoolCommands` builds `Invocation`s for each keytool sub-command the
//! engine needs. It never runs anything. Store and source passwords go on
//! stdin, one line per keytool prompt; only passwords keytool cannot prompt
//! for are passed as (masked) arguments.

use std::path::{Path, PathBuf};

use super::Invocation;
use crate::types::{EngineConfig, KeystoreRef, Secret, StoreFormat};

const ENGLISH_LOCALE: [&str; 2] = ["-J-Duser.language=en", "-J-Duser.country=US"];


/// Builds keytool invocations without executing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeytoolCommands {
    program: PathBuf,
    force_english_locale: bool,
}

impl KeytoolCommands {
    pub fn new(program: impl Into<PathBuf>, force_english_locale: bool) -> Self {
        KeytoolCommands {
            program: program.into(),
            force_english_locale,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        KeytoolCommands::new(config.keytool.clone(), config.force_english_locale)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn base(&self, subcommand: &str) -> Invocation {
        let inv = Invocation::new(self.program.clone());
        let inv = if self.force_english_locale {
            inv.args(ENGLISH_LOCALE)
        } else {
            inv
        };
        inv.arg(subcommand)
    }

    /// `keytool -list -v -keystore <path> -storetype <fmt>`
    ///
    /// stdin: store password.
    pub fn list(&self, store: &KeystoreRef) -> Invocation {
        self.list_file(&store.path, &store.format, Some(&store.password))
    }

    /// Verbose listing of any keystore-format file, used for source bundles.
    pub fn list_file(&self, path: &Path, format: &StoreFormat, password: Option<&Secret>) -> Invocation {
        let inv = self
            .base("-list")
            .arg("-v")
            .arg("-keystore")
            .arg(path_arg(path))
            .arg("-storetype")
            .arg(format.keytool_name());
        match password {
            Some(password) => inv.stdin_lines(&[password]),
            None => inv,
        }
    }

    /// `keytool -printcert -v -file <path>`
    pub fn print_cert(&self, path: &Path) -> Invocation {
        self.base("-printcert").arg("-v").arg("-file").arg(path_arg(path))
    }

    /// `keytool -delete -alias <alias> -keystore <path> -storetype <fmt>`
    ///
    /// stdin: store password.
    pub fn delete(&self, store: &KeystoreRef, alias: &str) -> Invocation {
        self.base("-delete")
            .arg("-alias")
            .arg(alias)
            .arg("-keystore")
            .arg(path_arg(&store.path))
            .arg("-storetype")
            .arg(store.format.keytool_name())
            .stdin_lines(&[&store.password])
    }

    /// `keytool -importkeystore -srckeystore <src> -srcstoretype <fmt>
    /// -srcalias <src-alias> -destkeystore <path> -deststoretype <fmt>
    /// -destalias <alias> -noprompt [-destkeypass ******]`
    ///
    /// stdin: destination password (twice when keytool is creating the
    /// keystore), then the source password.
    pub fn import_keystore(&self, request: &KeystoreImport<'_>) -> Invocation {
        let store = request.store;
        let inv = self
            .base("-importkeystore")
            .arg("-srckeystore")
            .arg(path_arg(request.source_path))
            .arg("-srcstoretype")
            .arg(request.source_format.keytool_name())
            .arg("-srcalias")
            .arg(request.source_alias)
            .arg("-destkeystore")
            .arg(path_arg(&store.path))
            .arg("-deststoretype")
            .arg(store.format.keytool_name())
            .arg("-destalias")
            .arg(request.alias)
            .arg("-noprompt");
        let inv = match request.key_password {
            Some(key_password) => inv.arg("-destkeypass").secret_arg(key_password),
            None => inv,
        };

        let mut answers = vec![&store.password];
        if !request.store_exists {
            answers.push(&store.password);
        }
        if let Some(source_password) = request.source_password {
            answers.push(source_password);
        }
        inv.stdin_lines(&answers)
    }

    /// `keytool -importcert -noprompt -trustcacerts -alias <alias>
    /// -file <cert> -keystore <path> -storetype <fmt>`
    ///
    /// stdin: store password (twice when keytool is creating the keystore).
    pub fn import_cert(&self, store: &KeystoreRef, store_exists: bool, alias: &str, cert: &Path) -> Invocation {
        let inv = self
            .base("-importcert")
            .arg("-noprompt")
            .arg("-trustcacerts")
            .arg("-alias")
            .arg(alias)
            .arg("-file")
            .arg(path_arg(cert))
            .arg("-keystore")
            .arg(path_arg(&store.path))
            .arg("-storetype")
            .arg(store.format.keytool_name());
        if store_exists {
            inv.stdin_lines(&[&store.password])
        } else {
            inv.stdin_lines(&[&store.password, &store.password])
        }
    }

    /// `keytool -keypasswd -alias <alias> -keystore <path> -storetype <fmt>`
    ///
    /// stdin: store password, old key password, new key password twice.
    pub fn change_key_password(&self, store: &KeystoreRef, alias: &str, old: &Secret, new: &Secret) -> Invocation {
        self.base("-keypasswd")
            .arg("-alias")
            .arg(alias)
            .arg("-keystore")
            .arg(path_arg(&store.path))
            .arg("-storetype")
            .arg(store.format.keytool_name())
            .stdin_lines(&[&store.password, old, new, new])
    }
}


/// Everything `-importkeystore` needs to copy one entry from a bundle.
#[derive(Debug, Clone, Copy)]
pub struct KeystoreImport<'a> {
    pub store: &'a KeystoreRef,
    pub store_exists: bool,
    pub alias: &'a str,
    pub source_path: &'a Path,
    pub source_format: &'a StoreFormat,
    pub source_password: Option<&'a Secret>,
    pub source_alias: &'a str,
    pub key_password: Option<&'a Secret>,
}


fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
