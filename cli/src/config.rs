//! Convergence file: YAML declaring the engine settings and the entries to
//! converge.
//!
//! Passwords are written inline or as `password_env: VAR`, read from the
//! environment at load time. Loading yields an `EngineConfig` and the list
//! of `DesiredSpec`s the engine works on.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use jks_converge_core::types::{
    DesiredSpec, EngineConfig, Ensure, FormatOverride, KeystoreRef, Secret, SourceBundle, SourceKind, StoreFormat,
};


/// Top-level convergence file.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvergenceFile {
    #[serde(default)]
    pub engine: EngineSection,
    pub entries: Vec<EntryDef>,
}


/// `engine:` section. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSection {
    #[serde(default)]
    pub keytool: Option<PathBuf>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub force_english_locale: Option<bool>,
    #[serde(default)]
    pub missing_keystore_markers: Option<Vec<String>>,
    #[serde(default)]
    pub formats: BTreeMap<String, FormatOverride>,
}


/// One declared alias.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryDef {
    pub alias: String,
    #[serde(default)]
    pub ensure: Ensure,
    pub keystore: StoreDef,
    #[serde(default)]
    pub source: Option<SourceDef>,
    #[serde(default)]
    pub key_password: Option<String>,
    #[serde(default)]
    pub key_password_env: Option<String>,
    #[serde(default)]
    pub previous_key_password: Option<String>,
    #[serde(default)]
    pub previous_key_password_env: Option<String>,
}


#[derive(Debug, Clone, Deserialize)]
pub struct StoreDef {
    pub path: PathBuf,
    #[serde(default = "default_format")]
    pub format: StoreFormat,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_env: Option<String>,
}


/// Either a keystore bundle (`path` + `format`) or a certificate file
/// (`certificate`).
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDef {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub certificate: Option<PathBuf>,
    #[serde(default = "default_format")]
    pub format: StoreFormat,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_env: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}


fn default_format() -> StoreFormat {
    StoreFormat::Pkcs12
}


/// What a loaded file resolves to.
#[derive(Debug, Clone)]
pub struct Convergence {
    pub engine: EngineConfig,
    pub specs: Vec<DesiredSpec>,
}


/// Load a convergence file, reading `*_env` passwords and `JAVA_HOME` from
/// the process environment.
pub fn load(path: &Path) -> Result<Convergence, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    let file = parse(&content)?;
    resolve(file, |var| std::env::var(var).ok())
}


/// Parse a convergence file from a YAML string.
pub fn parse(content: &str) -> Result<ConvergenceFile, String> {
    serde_yaml::from_str(content).map_err(|e| format!("invalid convergence file: {}", e))
}


/// Turn a parsed file into engine input. `env` looks up environment
/// variables.
pub fn resolve(file: ConvergenceFile, env: impl Fn(&str) -> Option<String>) -> Result<Convergence, String> {
    let engine = engine_config(file.engine, &env);
    let specs = file
        .entries
        .into_iter()
        .map(|entry| desired_spec(entry, &env))
        .collect::<Result<Vec<_>, String>>()?;
    Ok(Convergence { engine, specs })
}


fn engine_config(section: EngineSection, env: &impl Fn(&str) -> Option<String>) -> EngineConfig {
    let defaults = EngineConfig::default();
    let keytool = section.keytool.unwrap_or_else(|| match env("JAVA_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home).join("bin").join("keytool"),
        _ => defaults.keytool.clone(),
    });
    EngineConfig {
        keytool,
        timeout_ms: section.timeout_ms.unwrap_or(defaults.timeout_ms),
        force_english_locale: section
            .force_english_locale
            .unwrap_or(defaults.force_english_locale),
        missing_keystore_markers: section
            .missing_keystore_markers
            .unwrap_or(defaults.missing_keystore_markers),
        formats: section.formats,
    }
}


fn desired_spec(entry: EntryDef, env: &impl Fn(&str) -> Option<String>) -> Result<DesiredSpec, String> {
    let alias = entry.alias;
    if alias.trim().is_empty() {
        return Err("entry with an empty alias".into());
    }
    let context = |field: &str| format!("entry '{}': {}", alias, field);

    let store_password = secret(
        entry.keystore.password,
        entry.keystore.password_env,
        env,
        &context("keystore.password"),
    )?
    .ok_or_else(|| format!("{} is required", context("keystore.password")))?;
    let keystore = KeystoreRef::new(entry.keystore.path, entry.keystore.format, store_password);

    let source = match entry.source {
        Some(def) => Some(source_bundle(def, env, &context("source"))?),
        None => None,
    };
    if entry.ensure == Ensure::Present && source.is_none() {
        return Err(format!("{} is required when ensure is present", context("source")));
    }

    let key_password = secret(
        entry.key_password,
        entry.key_password_env,
        env,
        &context("key_password"),
    )?;
    let previous_key_password = secret(
        entry.previous_key_password,
        entry.previous_key_password_env,
        env,
        &context("previous_key_password"),
    )?;
    if previous_key_password.is_some() && key_password.is_none() {
        return Err(format!(
            "{} needs a key_password to rotate to",
            context("previous_key_password")
        ));
    }

    Ok(DesiredSpec {
        alias,
        ensure: entry.ensure,
        keystore,
        source,
        key_password,
        previous_key_password,
    })
}


fn source_bundle(
    def: SourceDef,
    env: &impl Fn(&str) -> Option<String>,
    context: &str,
) -> Result<SourceBundle, String> {
    let password = secret(def.password, def.password_env, env, &format!("{}.password", context))?;
    let mut bundle = match (def.path, def.certificate) {
        (Some(path), None) => SourceBundle {
            path,
            kind: SourceKind::Keystore(def.format),
            password,
            alias: None,
        },
        (None, Some(certificate)) => SourceBundle::certificate(certificate),
        (Some(_), Some(_)) => {
            return Err(format!("{}: give either path or certificate, not both", context));
        }
        (None, None) => return Err(format!("{}: path or certificate is required", context)),
    };
    bundle.alias = def.alias;
    Ok(bundle)
}


fn secret(
    inline: Option<String>,
    var: Option<String>,
    env: &impl Fn(&str) -> Option<String>,
    what: &str,
) -> Result<Option<Secret>, String> {
    match (inline, var) {
        (Some(_), Some(_)) => Err(format!("{}: give either a value or an _env variable, not both", what)),
        (Some(value), None) => Ok(Some(Secret::new(value))),
        (None, Some(var)) => env(&var)
            .map(|value| Some(Secret::new(value)))
            .ok_or_else(|| format!("{}: environment variable {} is not set", what, var)),
        (None, None) => Ok(None),
    }
}
