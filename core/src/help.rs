//! Help system: usage text for `jksc` commands.
//!
//! `jksc help` prints the overview, `jksc help <command>` the detailed usage
//! of one command, and `jksc help file` the convergence file format.


/// Generate help text for a given topic.
pub fn help_text(topic: Option<&str>) -> String {
    match topic {
        None => overview(),
        Some(t) => match command_help(t) {
            Some(text) => text,
            None => format!("Unknown help topic: '{}'. Run 'jksc help' for a list of commands.", t),
        },
    }
}


fn overview() -> String {
    "\
jksc: converge Java keystores to a declared state through keytool

Usage: jksc <command> <file> [--json] [--verbose]

Commands:
  apply <file>     Bring every declared entry to its desired state
  plan <file>      Show the operations apply would run, without running them
  inspect <file>   List the current entries of every declared keystore
  help [topic]     Show help (this message, or help on a command or 'file')

Flags:
  --json           Print the report as JSON on stdout
  --verbose, -v    Log every keytool invocation (passwords masked)

Logging goes to stderr and honors RUST_LOG. apply exits 1 when any entry
failed."
        .to_string()
}


fn command_help(topic: &str) -> Option<String> {
    let text = match topic {
        "apply" => "\
jksc apply <file> [--json] [--verbose]

For every entry of the file: inspect the keystore, resolve the source,
compare chains, then delete and re-import when they differ. Each entry
reports unchanged, changed, warning or failed. A failed entry never stops
the others.",
        "plan" => "\
jksc plan <file> [--json] [--verbose]

Run inspection, resolution and planning for every entry and print the
classification and planned operations. Nothing is modified.",
        "inspect" => "\
jksc inspect <file> [--json] [--verbose]

Print the aliases, entry kinds and certificate serial numbers of every
keystore named in the file.",
        "file" => "\
Convergence file (YAML):

  engine:                      # optional
    keytool: /usr/bin/keytool  # default: $JAVA_HOME/bin/keytool, else keytool
    timeout_ms: 120000
    force_english_locale: true
    formats:
      pkcs12: { in_place_key_password_change: false }
  entries:
    - alias: leaf_cert
      ensure: present          # or absent
      keystore: { path: /etc/app.ks, format: jks, password_env: STORE_PW }
      source: { path: /tmp/leaf.p12, format: pkcs12, password: secret, alias: Leaf Cert }
      key_password: abcdef123456
      previous_key_password: old-secret   # request a key password rotation

A source may instead be a single certificate: { certificate: /tmp/ca.pem }.",
        _ => return None,
    };
    Some(text.to_string())
}
