//! Parser for keytool's verbose listing (`keytool -list -v`).
//!
//! Only structurally stable labels are used as anchors: the entry count line,
//! `Alias name:`, `Entry type:`, `Certificate chain length:`, `Owner:` and
//! `Serial number:`. Everything else (dates, fingerprints, extensions,
//! warnings, password prompts) is ignored.

use super::{MalformedEntry, Snapshot};
use crate::error::ListingError;
use crate::types::{Certificate, CertificateChain, Entry, EntryKind};

const COUNT_PREFIX: &str = "Your keystore contains ";
const ALIAS: &str = "Alias name:";
const ENTRY_TYPE: &str = "Entry type:";
const CHAIN_LENGTH: &str = "Certificate chain length:";
const OWNER: &str = "Owner:";
const SERIAL: &str = "Serial number:";


/// Parse a full verbose listing into a `Snapshot`.
///
/// The whole listing is rejected only when it has no recognizable structure
/// or when the number of `Alias name:` blocks disagrees with the reported
/// entry count. A single entry that cannot be classified is recorded as
/// malformed and the rest of the snapshot is kept.
pub fn parse_listing(text: &str) -> Result<Snapshot, ListingError> {
    let mut reported: Option<usize> = None;
    let mut blocks: Vec<Vec<&str>> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if reported.is_none() {
            if let Some(rest) = trimmed.strip_prefix(COUNT_PREFIX) {
                reported = rest.split_whitespace().next().and_then(|n| n.parse().ok());
                continue;
            }
        }
        if trimmed.starts_with(ALIAS) {
            blocks.push(vec![line]);
        } else if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }

    match reported {
        None if blocks.is_empty() => return Err(ListingError::Unrecognized),
        Some(n) if n != blocks.len() => {
            return Err(ListingError::CountMismatch {
                reported: n,
                found: blocks.len(),
            })
        }
        _ => {}
    }

    let mut entries: Vec<Entry> = Vec::new();
    let mut malformed = Vec::new();
    for block in &blocks {
        match parse_entry(block) {
            Ok(entry) if entries.iter().any(|e| e.alias == entry.alias) => {
                malformed.push(MalformedEntry {
                    alias: Some(entry.alias),
                    reason: "alias listed twice".into(),
                });
            }
            Ok(entry) => entries.push(entry),
            Err(bad) => malformed.push(bad),
        }
    }
    Ok(Snapshot::from_parts(entries, malformed))
}


/// Collect `Owner:`/`Serial number:` pairs in order of appearance. Used for
/// `keytool -printcert -v` output and for the certificates of one entry.
pub fn parse_certificates(text: &str) -> Vec<Certificate> {
    collect_certificates(text.lines())
}


fn collect_certificates<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<Certificate> {
    let mut certificates = Vec::new();
    let mut owner: Option<&str> = None;
    for line in lines {
        if let Some(value) = label_value(line, OWNER) {
            owner = Some(value);
        } else if let Some(value) = label_value(line, SERIAL) {
            if !value.is_empty() {
                certificates.push(Certificate::new(value, owner.take()));
            }
        }
    }
    certificates
}


fn parse_entry(lines: &[&str]) -> Result<Entry, MalformedEntry> {
    let alias = lines
        .first()
        .and_then(|l| alias_value(l))
        .filter(|a| !a.is_empty())
        .ok_or_else(|| MalformedEntry {
            alias: None,
            reason: "empty alias".into(),
        })?;
    let malformed = |reason: String| MalformedEntry {
        alias: Some(alias.to_string()),
        reason,
    };

    let body = &lines[1..];
    let kind_label = body.iter().find_map(|l| label_value(l, ENTRY_TYPE));
    let chain_length = body.iter().find_map(|l| label_value(l, CHAIN_LENGTH));
    let certificates = collect_certificates(body.iter().copied());

    let kind = match kind_label {
        None => return Err(malformed("missing entry type".into())),
        Some(label) => EntryKind::from_label(label)
            .ok_or_else(|| malformed(format!("unrecognized entry type '{}'", label)))?,
    };
    let chain_length = match chain_length {
        None => None,
        Some(raw) => Some(
            raw.parse::<usize>()
                .map_err(|_| malformed(format!("unreadable chain length '{}'", raw)))?,
        ),
    };

    let chain = match kind {
        EntryKind::PrivateKeyWithChain => {
            let declared = chain_length.ok_or_else(|| malformed("missing certificate chain length".into()))?;
            if declared == 0 {
                return Err(malformed("empty certificate chain".into()));
            }
            if certificates.len() != declared {
                return Err(malformed(format!(
                    "chain length {} but {} serial numbers",
                    declared,
                    certificates.len()
                )));
            }
            CertificateChain::new(certificates)
        }
        EntryKind::TrustedCertificate => {
            let expected = chain_length.unwrap_or(1);
            if certificates.len() != expected || expected == 0 {
                return Err(malformed(format!(
                    "trusted certificate entry with {} serial numbers",
                    certificates.len()
                )));
            }
            CertificateChain::new(certificates)
        }
        EntryKind::SecretKey => CertificateChain::default(),
    };

    Ok(Entry {
        alias: alias.to_string(),
        kind,
        chain,
    })
}


/// The alias exactly as printed: only the single separating space after the
/// label is removed.
fn alias_value(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix(ALIAS)?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn label_value<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    line.trim_start().strip_prefix(label).map(str::trim)
}


#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ENTRIES: &str = "\
Keystore type: PKCS12
Keystore provider: SUN

Your keystore contains 2 entries

Alias name: leaf cert
Creation date: Oct 19, 2026
Entry type: PrivateKeyEntry
Certificate chain length: 3
Certificate[1]:
Owner: CN=Leaf Cert, O=Example
Issuer: CN=Intermediate, O=Example
Serial number: 5
Valid from: Mon Oct 19 10:00:00 UTC 2026 until: Tue Oct 19 10:00:00 UTC 2027
Certificate fingerprints:
\t SHA1: 3A:9F:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF:00:11:22
\t SHA256: 01:23:45:67:89:AB:CD:EF:01:23:45:67:89:AB:CD:EF:01:23:45:67:89:AB:CD:EF:01:23:45:67:89:AB:CD:EF
Signature algorithm name: SHA256withRSA
Subject Public Key Algorithm: 2048-bit RSA key
Version: 3

Extensions:

#1: ObjectId: 2.5.29.35 Criticality=false
AuthorityKeyIdentifier [
KeyIdentifier [
0000: 12 34 56 78                                        .4Vx
]
[CN=Root, O=Example]
SerialNumber: [    03]
]

Certificate[2]:
Owner: CN=Intermediate, O=Example
Issuer: CN=Root, O=Example
Serial number: 4
Valid from: Mon Oct 19 10:00:00 UTC 2026 until: Tue Oct 19 10:00:00 UTC 2027
Signature algorithm name: SHA256withRSA
Version: 3
Certificate[3]:
Owner: CN=Root, O=Example
Issuer: CN=Root, O=Example
Serial number: 3
Valid from: Mon Oct 19 10:00:00 UTC 2026 until: Tue Oct 19 10:00:00 UTC 2027
Version: 3


*******************************************
*******************************************


Alias name: root ca
Creation date: Oct 19, 2026
Entry type: trustedCertEntry

Owner: CN=Root, O=Example
Issuer: CN=Root, O=Example
Serial number: 3
Valid from: Mon Oct 19 10:00:00 UTC 2026 until: Tue Oct 19 10:00:00 UTC 2027
Version: 3


*******************************************
*******************************************
";

    #[test]
    fn two_entries_with_their_chain_lengths() {
        let snap = parse_listing(TWO_ENTRIES).unwrap();
        assert!(snap.store_exists());
        assert_eq!(snap.len(), 2);
        assert!(snap.malformed().is_empty());

        let leaf = snap.entry("leaf cert").unwrap();
        assert_eq!(leaf.kind, EntryKind::PrivateKeyWithChain);
        assert_eq!(leaf.chain.len(), 3);
        assert_eq!(leaf.chain.serials(), vec!["5", "4", "3"]);
        assert_eq!(
            leaf.chain.leaf().and_then(|c| c.subject.as_deref()),
            Some("CN=Leaf Cert, O=Example")
        );

        let root = snap.entry("root ca").unwrap();
        assert_eq!(root.kind, EntryKind::TrustedCertificate);
        assert_eq!(root.chain.serials(), vec!["3"]);
    }

    #[test]
    fn empty_keystore() {
        let text = "Keystore type: JKS\nKeystore provider: SUN\n\nYour keystore contains 0 entries\n\n";
        let snap = parse_listing(text).unwrap();
        assert!(snap.store_exists());
        assert!(snap.is_empty());
    }

    #[test]
    fn singular_entry_wording_and_legacy_labels() {
        let text = "\
Enter keystore password:
Keystore type: jks
Keystore provider: SUN

Your keystore contains 1 entry

Alias name: leaf_cert
Creation date: Oct 19, 2026
Entry type: keyEntry
Certificate chain length: 2
Certificate[1]:
Owner: CN=Leaf
Issuer: CN=Root
Serial number: 0a
Certificate[2]:
Owner: CN=Root
Issuer: CN=Root
Serial number: 1
";
        let snap = parse_listing(text).unwrap();
        let entry = snap.entry("leaf_cert").unwrap();
        assert_eq!(entry.kind, EntryKind::PrivateKeyWithChain);
        assert_eq!(entry.chain.serials(), vec!["a", "1"]);
    }

    #[test]
    fn count_mismatch_rejects_whole_listing() {
        let text = "Your keystore contains 3 entries\n\nAlias name: a\nEntry type: trustedCertEntry\nSerial number: 1\n";
        assert_eq!(
            parse_listing(text).unwrap_err(),
            ListingError::CountMismatch { reported: 3, found: 1 }
        );
    }

    #[test]
    fn non_verbose_listing_is_a_count_mismatch() {
        let text = "\
Keystore type: PKCS12
Keystore provider: SUN

Your keystore contains 1 entry

leaf cert, Oct 19, 2026, PrivateKeyEntry,
Certificate fingerprint (SHA-256): 01:23:45
";
        assert!(matches!(
            parse_listing(text),
            Err(ListingError::CountMismatch { reported: 1, found: 0 })
        ));
    }

    #[test]
    fn unrelated_output_is_unrecognized() {
        assert_eq!(parse_listing("").unwrap_err(), ListingError::Unrecognized);
        assert_eq!(
            parse_listing("Usage: keytool [OPTION]...\n").unwrap_err(),
            ListingError::Unrecognized
        );
    }

    #[test]
    fn bad_entry_is_isolated() {
        let text = "\
Your keystore contains 2 entries

Alias name: truncated
Entry type: PrivateKeyEntry
Certificate chain length: 2
Certificate[1]:
Owner: CN=Leaf
Serial number: 5

*******************************************

Alias name: fine
Entry type: trustedCertEntry
Owner: CN=Root
Serial number: 3
";
        let snap = parse_listing(text).unwrap();
        assert_eq!(snap.len(), 1);
        assert!(snap.entry("fine").is_some());
        assert!(snap.is_malformed("truncated"));
        assert!(snap.contains("truncated"));
        assert!(snap.malformed()[0].reason.contains("chain length 2"));
    }

    #[test]
    fn unknown_entry_type_is_malformed() {
        let text = "Your keystore contains 1 entry\n\nAlias name: odd\nEntry type: MysteryEntry\n";
        let snap = parse_listing(text).unwrap();
        assert!(snap.is_malformed("odd"));
        assert!(snap.malformed()[0].reason.contains("MysteryEntry"));
    }

    #[test]
    fn missing_count_line_is_tolerated() {
        let text = "Alias name: only\nEntry type: trustedCertEntry\nOwner: CN=Root\nSerial number: 3\n";
        let snap = parse_listing(text).unwrap();
        assert_eq!(snap.aliases().collect::<Vec<_>>(), vec!["only"]);
    }

    #[test]
    fn secret_key_entry_has_no_chain() {
        let text = "Your keystore contains 1 entry\n\nAlias name: aes\nCreation date: Oct 19, 2026\nEntry type: SecretKeyEntry\n";
        let snap = parse_listing(text).unwrap();
        let entry = snap.entry("aes").unwrap();
        assert_eq!(entry.kind, EntryKind::SecretKey);
        assert!(entry.chain.is_empty());
    }

    #[test]
    fn alias_keeps_inner_spacing_and_case() {
        let text = "Your keystore contains 1 entry\n\nAlias name: Mixed  Case\nEntry type: trustedCertEntry\nSerial number: 9\n";
        let snap = parse_listing(text).unwrap();
        assert!(snap.entry("Mixed  Case").is_some());
    }

    #[test]
    fn printcert_output() {
        let text = "\
Certificate[1]:
Owner: CN=Root, O=Example
Issuer: CN=Root, O=Example
Serial number: 3
Valid from: Mon Oct 19 10:00:00 UTC 2026 until: Tue Oct 19 10:00:00 UTC 2027
";
        let certs = parse_certificates(text);
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].serial, "3");
        assert_eq!(certs[0].subject.as_deref(), Some("CN=Root, O=Example"));
    }
}
