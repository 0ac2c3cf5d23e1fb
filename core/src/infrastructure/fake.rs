//! In-memory keytool for end-to-end tests of the engine.
//!
//! `FakeKeytool` understands the sub-commands the engine builds, keeps
//! keystores, bundles and certificate files in memory, and answers with the
//! same report layout and `keytool error:` lines the real tool prints.
//! Aliases are lowercased on the way in, as keytool does for JKS and PKCS12.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{Invocation, ToolOutput, ToolRunner};
use crate::error::InvokeError;
use crate::types::{Certificate, CertificateChain, EntryKind, StoreFormat};

const SEPARATOR: &str = "*******************************************";


#[derive(Debug, Clone)]
struct FakeEntry {
    kind: EntryKind,
    chain: CertificateChain,
    /// `None` when the key is protected by the store password.
    key_password: Option<String>,
}

#[derive(Debug, Clone)]
struct FakeStore {
    format: StoreFormat,
    password: String,
    entries: BTreeMap<String, FakeEntry>,
}

impl FakeStore {
    fn key_password_of(&self, entry: &FakeEntry) -> String {
        entry.key_password.clone().unwrap_or_else(|| self.password.clone())
    }
}

enum Injected {
    Output(ToolOutput),
    TimeOut,
}

#[derive(Default)]
struct State {
    stores: BTreeMap<PathBuf, FakeStore>,
    certificates: BTreeMap<PathBuf, Certificate>,
    injected: VecDeque<(String, Injected)>,
}


/// Simulated keytool. Every invocation is recorded.
#[derive(Default)]
pub struct FakeKeytool {
    state: RefCell<State>,
    invocations: RefCell<Vec<Invocation>>,
}

impl FakeKeytool {
    pub fn new() -> Self {
        Self::default()
    }

    // --- seeding ---

    /// Create an empty keystore (or source bundle) file.
    pub fn add_store(&self, path: impl Into<PathBuf>, format: StoreFormat, password: &str) {
        self.state.borrow_mut().stores.insert(
            path.into(),
            FakeStore {
                format,
                password: password.to_string(),
                entries: BTreeMap::new(),
            },
        );
    }

    /// Add a private key with the given chain (leaf first), protected by the
    /// store password. Ignored when the store was never added.
    pub fn add_key(&self, path: impl AsRef<Path>, alias: &str, serials: &[&str]) {
        self.insert(path.as_ref(), alias, EntryKind::PrivateKeyWithChain, serials, None);
    }

    pub fn add_key_with_password(&self, path: impl AsRef<Path>, alias: &str, serials: &[&str], key_password: &str) {
        self.insert(
            path.as_ref(),
            alias,
            EntryKind::PrivateKeyWithChain,
            serials,
            Some(key_password.to_string()),
        );
    }

    pub fn add_trusted(&self, path: impl AsRef<Path>, alias: &str, serial: &str) {
        self.insert(path.as_ref(), alias, EntryKind::TrustedCertificate, &[serial], None);
    }

    /// A PEM/DER certificate file readable by `-printcert` and `-importcert`.
    pub fn add_certificate_file(&self, path: impl Into<PathBuf>, serial: &str, subject: &str) {
        self.state
            .borrow_mut()
            .certificates
            .insert(path.into(), Certificate::new(serial, Some(subject)));
    }

    fn insert(&self, path: &Path, alias: &str, kind: EntryKind, serials: &[&str], key_password: Option<String>) {
        if let Some(store) = self.state.borrow_mut().stores.get_mut(path) {
            store.entries.insert(
                fold(alias),
                FakeEntry {
                    kind,
                    chain: CertificateChain::from_serials(serials),
                    key_password,
                },
            );
        }
    }

    // --- failure injection ---

    /// The next run of `subcommand` (e.g. `-importkeystore`) returns `output`
    /// without touching any store.
    pub fn fail_next(&self, subcommand: &str, output: ToolOutput) {
        self.state
            .borrow_mut()
            .injected
            .push_back((subcommand.to_string(), Injected::Output(output)));
    }

    /// The next run of `subcommand` times out without touching any store.
    pub fn time_out_next(&self, subcommand: &str) {
        self.state
            .borrow_mut()
            .injected
            .push_back((subcommand.to_string(), Injected::TimeOut));
    }

    // --- inspection ---

    pub fn store_exists(&self, path: impl AsRef<Path>) -> bool {
        self.state.borrow().stores.contains_key(path.as_ref())
    }

    pub fn aliases(&self, path: impl AsRef<Path>) -> Vec<String> {
        self.state
            .borrow()
            .stores
            .get(path.as_ref())
            .map(|s| s.entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Serial numbers of the entry's chain, leaf first.
    pub fn chain(&self, path: impl AsRef<Path>, alias: &str) -> Option<Vec<String>> {
        let state = self.state.borrow();
        let entry = state.stores.get(path.as_ref())?.entries.get(&fold(alias))?;
        Some(entry.chain.serials().into_iter().map(str::to_string).collect())
    }

    /// The password that currently unlocks the key.
    pub fn key_password(&self, path: impl AsRef<Path>, alias: &str) -> Option<String> {
        let state = self.state.borrow();
        let store = state.stores.get(path.as_ref())?;
        let entry = store.entries.get(&fold(alias))?;
        Some(store.key_password_of(entry))
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    pub fn subcommands(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .filter_map(|inv| inv.subcommand().map(str::to_string))
            .collect()
    }

    /// Number of runs that could have modified a keystore.
    pub fn mutating_runs(&self) -> usize {
        self.subcommands()
            .iter()
            .filter(|s| !matches!(s.as_str(), "-list" | "-printcert"))
            .count()
    }

    fn take_injected(&self, subcommand: &str) -> Option<Injected> {
        let mut state = self.state.borrow_mut();
        let pos = state.injected.iter().position(|(s, _)| s == subcommand)?;
        state.injected.remove(pos).map(|(_, injected)| injected)
    }
}


impl ToolRunner for FakeKeytool {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, InvokeError> {
        self.invocations.borrow_mut().push(invocation.clone());
        let subcommand = invocation.subcommand().unwrap_or_default();

        match self.take_injected(subcommand) {
            Some(Injected::Output(output)) => return Ok(output),
            Some(Injected::TimeOut) => {
                return Err(InvokeError::TimedOut {
                    program: invocation.program().display().to_string(),
                    after: Duration::from_millis(0),
                    stdout: String::new(),
                    stderr: "Enter keystore password:".into(),
                })
            }
            None => {}
        }

        let answers: Vec<&str> = invocation.stdin().map(|s| s.lines().collect()).unwrap_or_default();
        let mut state = self.state.borrow_mut();
        let output = match subcommand {
            "-list" => list(&state, invocation, &answers),
            "-printcert" => print_cert(&state, invocation),
            "-delete" => delete(&mut state, invocation, &answers),
            "-importkeystore" => import_keystore(&mut state, invocation, &answers),
            "-importcert" => import_cert(&mut state, invocation, &answers),
            "-keypasswd" => change_key_password(&mut state, invocation, &answers),
            other => error(&format!("Illegal option:  {}", other)),
        };
        Ok(output)
    }
}


// ---------------------------------------------------------------------------
// Sub-commands
// ---------------------------------------------------------------------------

fn list(state: &State, inv: &Invocation, answers: &[&str]) -> ToolOutput {
    let store = match open(state, inv.arg_after("-keystore"), answers.first().copied()) {
        Ok(store) => store,
        Err(output) => return output,
    };
    let count = store.entries.len();
    let mut out = format!(
        "Keystore type: {}\nKeystore provider: SUN\n\nYour keystore contains {} {}\n\n",
        store.format.keytool_name(),
        count,
        if count == 1 { "entry" } else { "entries" }
    );
    for (alias, entry) in &store.entries {
        out.push_str(&format!("Alias name: {}\nCreation date: Oct 19, 2026\n", alias));
        match entry.kind {
            EntryKind::PrivateKeyWithChain => {
                out.push_str("Entry type: PrivateKeyEntry\n");
                out.push_str(&format!("Certificate chain length: {}\n", entry.chain.len()));
                for (i, cert) in entry.chain.certificates().iter().enumerate() {
                    out.push_str(&format!("Certificate[{}]:\n", i + 1));
                    out.push_str(&describe(cert, alias));
                }
            }
            EntryKind::TrustedCertificate => {
                out.push_str("Entry type: trustedCertEntry\n\n");
                for cert in entry.chain.certificates() {
                    out.push_str(&describe(cert, alias));
                }
            }
            EntryKind::SecretKey => out.push_str("Entry type: SecretKeyEntry\n"),
        }
        out.push_str(&format!("\n\n{}\n{}\n\n\n", SEPARATOR, SEPARATOR));
    }
    ToolOutput {
        exit_code: Some(0),
        stdout: out,
        stderr: "Enter keystore password:  ".into(),
    }
}

fn print_cert(state: &State, inv: &Invocation) -> ToolOutput {
    let path = inv.arg_after("-file").unwrap_or_default();
    match state.certificates.get(Path::new(path)) {
        Some(cert) => ToolOutput::ok(describe(cert, "certificate")),
        None => error(&format!("java.io.FileNotFoundException: {} (No such file or directory)", path)),
    }
}

fn delete(state: &mut State, inv: &Invocation, answers: &[&str]) -> ToolOutput {
    let path = inv.arg_after("-keystore");
    if let Err(output) = open(state, path, answers.first().copied()) {
        return output;
    }
    let alias = inv.arg_after("-alias").unwrap_or_default();
    let store = match path.and_then(|p| state.stores.get_mut(Path::new(p))) {
        Some(store) => store,
        None => return error("java.lang.Exception: Keystore file does not exist"),
    };
    match store.entries.remove(&fold(alias)) {
        Some(_) => ToolOutput::ok(""),
        None => error(&format!("java.lang.Exception: Alias <{}> does not exist", alias)),
    }
}

fn import_keystore(state: &mut State, inv: &Invocation, answers: &[&str]) -> ToolOutput {
    let dest = PathBuf::from(inv.arg_after("-destkeystore").unwrap_or_default());
    let dest_exists = state.stores.contains_key(&dest);
    let (dest_password, source_password) = match (dest_exists, answers) {
        (true, [dest, source, ..]) => (*dest, *source),
        (false, [dest, again, source, ..]) if dest == again => (*dest, *source),
        (false, [_, _, _, ..]) => return error("java.lang.Exception: Passwords must match"),
        _ => return error("java.lang.RuntimeException: Too many failures - try later"),
    };
    if let Some(store) = state.stores.get(&dest) {
        if store.password != dest_password {
            return error("java.io.IOException: Keystore was tampered with, or password was incorrect");
        }
    }

    let source = match open(state, inv.arg_after("-srckeystore"), Some(source_password)) {
        Ok(source) => source,
        Err(output) => return output,
    };
    let source_alias = inv.arg_after("-srcalias").unwrap_or_default();
    let entry = match source.entries.get(&fold(source_alias)) {
        Some(entry) => entry,
        None => return error(&format!("java.lang.Exception: Alias <{}> does not exist", source_alias)),
    };
    let imported = FakeEntry {
        kind: entry.kind,
        chain: entry.chain.clone(),
        key_password: Some(
            inv.arg_after("-destkeypass")
                .map(str::to_string)
                .unwrap_or_else(|| source.key_password_of(entry)),
        ),
    };

    let alias = fold(inv.arg_after("-destalias").unwrap_or(source_alias));
    let format = StoreFormat::from(inv.arg_after("-deststoretype").unwrap_or("pkcs12"));
    let store = state.stores.entry(dest).or_insert_with(|| FakeStore {
        format,
        password: dest_password.to_string(),
        entries: BTreeMap::new(),
    });
    let mut imported = imported;
    if imported.key_password.as_deref() == Some(store.password.as_str()) || store.format == StoreFormat::Pkcs12 {
        imported.key_password = None;
    }
    store.entries.insert(alias, imported);
    ToolOutput::ok("")
}

fn import_cert(state: &mut State, inv: &Invocation, answers: &[&str]) -> ToolOutput {
    let dest = PathBuf::from(inv.arg_after("-keystore").unwrap_or_default());
    let dest_exists = state.stores.contains_key(&dest);
    let password = match (dest_exists, answers) {
        (true, [password, ..]) => *password,
        (false, [password, again, ..]) if password == again => *password,
        _ => return error("java.lang.Exception: Passwords must match"),
    };
    if let Some(store) = state.stores.get(&dest) {
        if store.password != password {
            return error("java.io.IOException: Keystore was tampered with, or password was incorrect");
        }
    }
    let file = inv.arg_after("-file").unwrap_or_default();
    let cert = match state.certificates.get(Path::new(file)) {
        Some(cert) => cert.clone(),
        None => return error(&format!("java.io.FileNotFoundException: {} (No such file or directory)", file)),
    };
    let alias = fold(inv.arg_after("-alias").unwrap_or("mykey"));
    let format = StoreFormat::from(inv.arg_after("-storetype").unwrap_or("pkcs12"));
    let store = state.stores.entry(dest).or_insert_with(|| FakeStore {
        format,
        password: password.to_string(),
        entries: BTreeMap::new(),
    });
    if store.entries.contains_key(&alias) {
        return error(&format!(
            "java.lang.Exception: Certificate not imported, alias <{}> already exists",
            alias
        ));
    }
    store.entries.insert(
        alias,
        FakeEntry {
            kind: EntryKind::TrustedCertificate,
            chain: CertificateChain::new(vec![cert]),
            key_password: None,
        },
    );
    ToolOutput::ok("Certificate was added to keystore\n")
}

fn change_key_password(state: &mut State, inv: &Invocation, answers: &[&str]) -> ToolOutput {
    let path = inv.arg_after("-keystore");
    if let Err(output) = open(state, path, answers.first().copied()) {
        return output;
    }
    let store = match path.and_then(|p| state.stores.get_mut(Path::new(p))) {
        Some(store) => store,
        None => return error("java.lang.Exception: Keystore file does not exist"),
    };
    if store.format == StoreFormat::Pkcs12 {
        return error("java.lang.UnsupportedOperationException: -keypasswd commands not supported if -storetype is PKCS12");
    }
    let alias = inv.arg_after("-alias").unwrap_or_default();
    let store_password = store.password.clone();
    let entry = match store.entries.get_mut(&fold(alias)) {
        Some(entry) => entry,
        None => return error(&format!("java.lang.Exception: Alias <{}> does not exist", alias)),
    };
    let current = entry.key_password.clone().unwrap_or(store_password);
    if answers.get(1).copied() != Some(current.as_str()) {
        return error("java.security.UnrecoverableKeyException: Cannot recover key");
    }
    match (answers.get(2), answers.get(3)) {
        (Some(new), Some(again)) if new == again => entry.key_password = Some(new.to_string()),
        _ => return error("java.lang.Exception: Passwords must be the same"),
    }
    ToolOutput::ok("")
}


// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Look up a store and check its password, producing keytool's diagnostics.
fn open<'s>(state: &'s State, path: Option<&str>, password: Option<&str>) -> Result<&'s FakeStore, ToolOutput> {
    let path = path.unwrap_or_default();
    let store = state.stores.get(Path::new(path)).ok_or_else(|| {
        error(&format!("java.lang.Exception: Keystore file does not exist: {}", path))
    })?;
    if password != Some(store.password.as_str()) {
        return Err(error(
            "java.io.IOException: Keystore was tampered with, or password was incorrect",
        ));
    }
    Ok(store)
}

fn describe(cert: &Certificate, alias: &str) -> String {
    let owner = cert
        .subject
        .clone()
        .unwrap_or_else(|| format!("CN={}", alias));
    format!(
        "Owner: {}\nIssuer: CN=Fake CA\nSerial number: {}\nValid from: Mon Oct 19 10:00:00 UTC 2026 until: Tue Oct 19 10:00:00 UTC 2027\nVersion: 3\n",
        owner, cert.serial
    )
}

fn error(message: &str) -> ToolOutput {
    ToolOutput::failed(1, format!("keytool error: {}\n", message), "")
}

fn fold(alias: &str) -> String {
    alias.to_lowercase()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::keytool::{KeystoreImport, KeytoolCommands};
    use crate::types::{KeystoreRef, Secret};

    fn commands() -> KeytoolCommands {
        KeytoolCommands::new("keytool", true)
    }

    fn store() -> KeystoreRef {
        KeystoreRef::new("/etc/app.ks", StoreFormat::Jks, "changeit")
    }

    #[test]
    fn listing_of_missing_store_reports_missing_file() {
        let fake = FakeKeytool::new();
        let out = fake.run(&commands().list(&store())).unwrap();
        assert!(!out.success());
        assert!(out.stdout.contains("Keystore file does not exist"));
    }

    #[test]
    fn listing_requires_the_store_password() {
        let fake = FakeKeytool::new();
        fake.add_store("/etc/app.ks", StoreFormat::Jks, "other");
        let out = fake.run(&commands().list(&store())).unwrap();
        assert!(out.diagnostic().contains("password was incorrect"));
    }

    #[test]
    fn import_creates_store_and_folds_alias() {
        let fake = FakeKeytool::new();
        fake.add_store("/tmp/leaf.p12", StoreFormat::Pkcs12, "pkcs12pass");
        fake.add_key("/tmp/leaf.p12", "Leaf Cert", &["5", "4"]);
        let source_password = Secret::new("pkcs12pass");
        let key_password = Secret::new("abcdef123456");
        let target = store();
        let out = fake
            .run(&commands().import_keystore(&KeystoreImport {
                store: &target,
                store_exists: false,
                alias: "Leaf_Cert",
                source_path: Path::new("/tmp/leaf.p12"),
                source_format: &StoreFormat::Pkcs12,
                source_password: Some(&source_password),
                source_alias: "Leaf Cert",
                key_password: Some(&key_password),
            }))
            .unwrap();
        assert!(out.success(), "{}", out.diagnostic());
        assert_eq!(fake.aliases("/etc/app.ks"), vec!["leaf_cert"]);
        assert_eq!(fake.chain("/etc/app.ks", "leaf_cert"), Some(vec!["5".into(), "4".into()]));
        assert_eq!(fake.key_password("/etc/app.ks", "leaf_cert").as_deref(), Some("abcdef123456"));
    }

    #[test]
    fn injected_failure_leaves_store_untouched() {
        let fake = FakeKeytool::new();
        fake.add_store("/etc/app.ks", StoreFormat::Jks, "changeit");
        fake.add_trusted("/etc/app.ks", "ca", "1");
        fake.fail_next("-delete", ToolOutput::failed(1, "keytool error: boom\n", ""));
        let out = fake.run(&commands().delete(&store(), "ca")).unwrap();
        assert!(!out.success());
        assert_eq!(fake.aliases("/etc/app.ks"), vec!["ca"]);
        let out = fake.run(&commands().delete(&store(), "ca")).unwrap();
        assert!(out.success());
        assert!(fake.aliases("/etc/app.ks").is_empty());
        assert_eq!(fake.mutating_runs(), 2);
    }

    #[test]
    fn keypasswd_is_refused_for_pkcs12() {
        let fake = FakeKeytool::new();
        let target = KeystoreRef::new("/etc/app.p12", StoreFormat::Pkcs12, "changeit");
        fake.add_store("/etc/app.p12", StoreFormat::Pkcs12, "changeit");
        fake.add_key("/etc/app.p12", "k", &["1"]);
        let out = fake
            .run(&commands().change_key_password(&target, "k", &Secret::new("changeit"), &Secret::new("x")))
            .unwrap();
        assert!(out.diagnostic().contains("not supported"));
    }

    #[test]
    fn keypasswd_reads_old_and_new_password_from_stdin() {
        let fake = FakeKeytool::new();
        let target = KeystoreRef::new("/etc/app.ks", StoreFormat::Jks, "changeit");
        fake.add_store("/etc/app.ks", StoreFormat::Jks, "changeit");
        fake.add_key_with_password("/etc/app.ks", "k", &["1"], "old-secret");

        let wrong = commands().change_key_password(&target, "k", &Secret::new("guess"), &Secret::new("x"));
        assert!(fake.run(&wrong).unwrap().diagnostic().contains("Cannot recover key"));
        assert_eq!(fake.key_password("/etc/app.ks", "k").as_deref(), Some("old-secret"));

        let right = commands().change_key_password(&target, "k", &Secret::new("old-secret"), &Secret::new("new-secret"));
        assert!(fake.run(&right).unwrap().success());
        assert_eq!(fake.key_password("/etc/app.ks", "k").as_deref(), Some("new-secret"));
    }

    #[test]
    fn printcert_describes_certificate_file() {
        let fake = FakeKeytool::new();
        fake.add_certificate_file("/tmp/ca.pem", "0A", "CN=Root");
        let out = fake.run(&commands().print_cert(Path::new("/tmp/ca.pem"))).unwrap();
        assert!(out.stdout.contains("Serial number: a"));
        assert!(out.stdout.contains("Owner: CN=Root"));
    }
}
