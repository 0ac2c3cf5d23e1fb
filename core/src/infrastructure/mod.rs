//! Process boundary to keytool.
//!
//! `ToolRunner` is the trait every stage uses to invoke the external tool.
//! `ProcessRunner` spawns real processes; `MockRunner` replays canned output
//! and `FakeKeytool` simulates keytool over in-memory keystores for tests.
//! `keytool` builds the invocations without executing them.

pub mod fake;
pub mod keytool;
pub mod mock;
pub mod runner;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::InvokeError;
use crate::types::Secret;


/// Trait for running one external tool invocation to completion.
pub trait ToolRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, InvokeError>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, InvokeError> {
        (**self).run(invocation)
    }
}


// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq)]
enum Arg {
    Plain(String),
    Secret(Secret),
}

/// Program, argument vector and stdin payload for one tool run.
///
/// Arguments added with `secret_arg` and the whole stdin payload are masked
/// in `Display` and `Debug`, so an invocation can always be logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<Arg>,
    stdin: Option<Secret>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|a| Arg::Plain(a.into())));
        self
    }

    pub fn secret_arg(mut self, secret: &Secret) -> Self {
        self.args.push(Arg::Secret(secret.clone()));
        self
    }

    /// Feed each secret as one line on stdin, answering keytool's prompts in
    /// order.
    pub fn stdin_lines(mut self, lines: &[&Secret]) -> Self {
        let mut payload = String::new();
        for line in lines {
            payload.push_str(line.expose());
            payload.push('\n');
        }
        self.stdin = Some(Secret::new(payload));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The real argument vector, secrets included.
    pub fn argv(&self) -> Vec<&str> {
        self.args
            .iter()
            .map(|a| match a {
                Arg::Plain(s) => s.as_str(),
                Arg::Secret(s) => s.expose(),
            })
            .collect()
    }

    pub fn stdin(&self) -> Option<&str> {
        self.stdin.as_ref().map(|s| s.expose())
    }

    /// Whether a plain (non-secret) argument is present.
    pub fn has_arg(&self, wanted: &str) -> bool {
        self.args
            .iter()
            .any(|a| matches!(a, Arg::Plain(s) if s == wanted))
    }

    /// Value of the plain argument following `flag`, if any.
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        let argv = self.argv();
        let pos = argv.iter().position(|a| *a == flag)?;
        argv.get(pos + 1).copied()
    }

    /// The keytool sub-command (`-list`, `-delete`, ...), skipping JVM flags.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.iter().find_map(|a| match a {
            Arg::Plain(s) if s.starts_with('-') && !s.starts_with("-J") => Some(s.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            match arg {
                Arg::Plain(s) => write!(f, " {}", shell_escape(s))?,
                Arg::Secret(_) => f.write_str(" ******")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("command", &self.to_string())
            .field("stdin", &self.stdin.as_ref().map(|_| "******"))
            .finish()
    }
}


/// Quote an argument for display the way a POSIX shell would need it.
fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | ',')
    }) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}


// ---------------------------------------------------------------------------
// ToolOutput
// ---------------------------------------------------------------------------

/// Exit status and captured streams of a finished invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        ToolOutput {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        ToolOutput {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// The text worth showing a user when the run failed. keytool writes its
    /// `keytool error:` lines to stdout and its prompts to stderr, so those
    /// lines win over everything else.
    pub fn diagnostic(&self) -> String {
        let errors: Vec<&str> = self
            .stdout
            .lines()
            .chain(self.stderr.lines())
            .map(str::trim)
            .filter(|l| l.starts_with("keytool error"))
            .collect();
        if !errors.is_empty() {
            return errors.join("\n");
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            stderr.to_string()
        } else {
            self.stdout.trim().to_string()
        }
    }

    /// Whether any stream mentions one of `markers`.
    pub fn mentions_any(&self, markers: &[String]) -> bool {
        markers
            .iter()
            .any(|m| self.stdout.contains(m.as_str()) || self.stderr.contains(m.as_str()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_masks_secrets() {
        let inv = Invocation::new("keytool")
            .args(["-importkeystore", "-destalias", "leaf cert"])
            .arg("-destkeypass")
            .secret_arg(&Secret::new("hunter2"));
        assert_eq!(inv.to_string(), "keytool -importkeystore -destalias 'leaf cert' -destkeypass ******");
        assert!(!format!("{:?}", inv).contains("hunter2"));
        assert_eq!(inv.argv().last(), Some(&"hunter2"));
    }

    #[test]
    fn display_quotes_shell_specials() {
        let inv = Invocation::new("keytool").args(["-alias", "it's", "-file", ""]);
        assert_eq!(inv.to_string(), "keytool -alias 'it'\\''s' -file ''");
    }

    #[test]
    fn stdin_lines_are_newline_terminated() {
        let a = Secret::new("one");
        let b = Secret::new("two");
        let inv = Invocation::new("keytool").stdin_lines(&[&a, &a, &b]);
        assert_eq!(inv.stdin(), Some("one\none\ntwo\n"));
        assert!(!format!("{:?}", inv).contains("one"));
    }

    #[test]
    fn subcommand_skips_jvm_flags() {
        let inv = Invocation::new("keytool").args(["-J-Duser.language=en", "-list", "-v"]);
        assert_eq!(inv.subcommand(), Some("-list"));
        assert_eq!(inv.arg_after("-list"), Some("-v"));
        assert!(inv.has_arg("-v"));
        assert!(!inv.has_arg("-rfc"));
    }

    #[test]
    fn diagnostic_prefers_keytool_error_lines() {
        let out = ToolOutput::failed(
            1,
            "keytool error: java.io.IOException: keystore password was incorrect\n",
            "Enter keystore password:  \n",
        );
        assert_eq!(
            out.diagnostic(),
            "keytool error: java.io.IOException: keystore password was incorrect"
        );
    }

    #[test]
    fn diagnostic_falls_back_to_stderr_then_stdout() {
        assert_eq!(ToolOutput::failed(2, "out", " err \n").diagnostic(), "err");
        assert_eq!(ToolOutput::failed(2, " out ", "").diagnostic(), "out");
    }

    #[test]
    fn mentions_any_checks_both_streams() {
        let out = ToolOutput::failed(
            1,
            "keytool error: java.lang.Exception: Keystore file does not exist: /x.ks",
            "",
        );
        assert!(out.mentions_any(&["Keystore file does not exist".into()]));
        assert!(!out.mentions_any(&["nope".into()]));
    }
}
