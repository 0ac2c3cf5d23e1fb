//! Desired state resolver: reads the source bundle through keytool and picks
//! the one entry the caller intends to install.
//!
//! Selection without an explicit source alias is deterministic: the single
//! private-key entry of the bundle, or its single entry of any kind when it
//! holds no private keys. More than one candidate is `Ambiguous`.

use serde::Serialize;
use tracing::debug;

use crate::error::ResolveError;
use crate::infrastructure::keytool::KeytoolCommands;
use crate::infrastructure::ToolRunner;
use crate::snapshot::listing::{parse_certificates, parse_listing};
use crate::snapshot::Snapshot;
use crate::types::{
    CapabilityTable, CertificateChain, Entry, EntryKind, FormatCapabilities, SourceBundle, SourceKind,
};


/// The entry a source resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesiredEntry {
    /// Alias inside the bundle, as keytool reports it. `None` for a plain
    /// certificate file.
    pub source_alias: Option<String>,
    pub kind: EntryKind,
    pub chain: CertificateChain,
}


pub struct Resolver<'a, R: ToolRunner> {
    runner: &'a R,
    commands: &'a KeytoolCommands,
    capabilities: &'a CapabilityTable,
}

impl<'a, R: ToolRunner> Resolver<'a, R> {
    pub fn new(runner: &'a R, commands: &'a KeytoolCommands, capabilities: &'a CapabilityTable) -> Self {
        Resolver {
            runner,
            commands,
            capabilities,
        }
    }

    pub fn resolve(&self, source: &SourceBundle) -> Result<DesiredEntry, ResolveError> {
        let desired = match &source.kind {
            SourceKind::Keystore(format) => {
                let output = self.runner.run(&self.commands.list_file(
                    &source.path,
                    format,
                    source.password.as_ref(),
                ))?;
                if !output.success() {
                    return Err(ResolveError::Unreadable(output.diagnostic()));
                }
                let snapshot = parse_listing(&output.stdout)?;
                let entry = select(&snapshot, source.alias.as_deref(), self.capabilities.lookup(format))?;
                DesiredEntry {
                    source_alias: Some(entry.alias.clone()),
                    kind: entry.kind,
                    chain: entry.chain.clone(),
                }
            }
            SourceKind::Certificate => {
                let output = self.runner.run(&self.commands.print_cert(&source.path))?;
                if !output.success() {
                    return Err(ResolveError::Unreadable(output.diagnostic()));
                }
                // A trusted-certificate entry holds exactly one certificate.
                let first = parse_certificates(&output.stdout)
                    .into_iter()
                    .next()
                    .ok_or_else(|| ResolveError::Unreadable("no certificate found".into()))?;
                DesiredEntry {
                    source_alias: None,
                    kind: EntryKind::TrustedCertificate,
                    chain: CertificateChain::new(vec![first]),
                }
            }
        };
        debug!(
            source = %source.path.display(),
            kind = %desired.kind,
            chain = %desired.chain,
            "resolved desired entry"
        );
        Ok(desired)
    }
}


fn select<'s>(
    snapshot: &'s Snapshot,
    requested: Option<&str>,
    caps: FormatCapabilities,
) -> Result<&'s Entry, ResolveError> {
    if let Some(requested) = requested {
        let folded = caps.fold_alias(requested);
        if let Some(entry) = snapshot.entry(requested).or_else(|| snapshot.entry(&folded)) {
            return Ok(entry);
        }
        if snapshot.is_malformed(requested) || snapshot.is_malformed(&folded) {
            return Err(ResolveError::Unreadable(format!(
                "entry '{}' could not be parsed",
                requested
            )));
        }
        return Err(ResolveError::AliasNotFound {
            requested: requested.to_string(),
            available: snapshot.aliases().map(str::to_string).collect(),
        });
    }

    let keys: Vec<&Entry> = snapshot
        .entries()
        .filter(|e| e.kind == EntryKind::PrivateKeyWithChain)
        .collect();
    let candidates = if keys.is_empty() {
        snapshot.entries().collect()
    } else {
        keys
    };
    match candidates.as_slice() {
        [] => Err(ResolveError::Unreadable("bundle holds no usable entries".into())),
        [only] => Ok(*only),
        many => Err(ResolveError::Ambiguous {
            candidates: many.iter().map(|e| e.alias.clone()).collect(),
        }),
    }
}
