//! Recording test double for `ToolRunner`.
//!
//! Returns pre-configured responses in order and records every invocation,
//! making it easy to drive a single stage with captured keytool output.

use std::cell::RefCell;
use std::collections::VecDeque;

use super::{Invocation, ToolOutput, ToolRunner};
use crate::error::InvokeError;


/// Test-double runner that records invocations and returns queued responses.
/// Once the queue is empty every run succeeds with empty output.
pub struct MockRunner {
    responses: RefCell<VecDeque<Result<ToolOutput, InvokeError>>>,
    invocations: RefCell<Vec<Invocation>>,
}

impl MockRunner {
    pub fn new() -> Self {
        MockRunner {
            responses: RefCell::new(VecDeque::new()),
            invocations: RefCell::new(Vec::new()),
        }
    }

    pub fn with_responses(responses: Vec<Result<ToolOutput, InvokeError>>) -> Self {
        MockRunner {
            responses: RefCell::new(responses.into()),
            invocations: RefCell::new(Vec::new()),
        }
    }

    /// Queue one more response.
    pub fn push(&self, response: Result<ToolOutput, InvokeError>) {
        self.responses.borrow_mut().push_back(response);
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.borrow().clone()
    }

    /// Sub-commands run so far, in order (`-list`, `-delete`, ...).
    pub fn subcommands(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .filter_map(|inv| inv.subcommand().map(str::to_string))
            .collect()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRunner for MockRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, InvokeError> {
        self.invocations.borrow_mut().push(invocation.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(ToolOutput::ok("")))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_runner_records_invocations() {
        let runner = MockRunner::new();
        runner.run(&Invocation::new("keytool").arg("-list")).unwrap();
        runner.run(&Invocation::new("keytool").arg("-delete")).unwrap();
        assert_eq!(runner.invocations().len(), 2);
        assert_eq!(runner.subcommands(), vec!["-list", "-delete"]);
    }

    #[test]
    fn mock_runner_returns_responses_in_order() {
        let runner = MockRunner::with_responses(vec![
            Ok(ToolOutput::ok("first")),
            Ok(ToolOutput::failed(1, "keytool error: boom", "")),
        ]);
        runner.push(Ok(ToolOutput::ok("third")));
        let inv = Invocation::new("keytool");
        assert_eq!(runner.run(&inv).unwrap().stdout, "first");
        assert_eq!(runner.run(&inv).unwrap().exit_code, Some(1));
        assert_eq!(runner.run(&inv).unwrap().stdout, "third");
    }

    #[test]
    fn mock_runner_defaults_to_empty_success() {
        let runner = MockRunner::new();
        let out = runner.run(&Invocation::new("keytool")).unwrap();
        assert!(out.success());
        assert!(out.stdout.is_empty());
    }

    #[test]
    fn mock_runner_propagates_errors() {
        let runner = MockRunner::with_responses(vec![Err(InvokeError::TimedOut {
            program: "keytool".into(),
            after: std::time::Duration::from_millis(5),
            stdout: String::new(),
            stderr: String::new(),
        })]);
        let err = runner.run(&Invocation::new("keytool")).unwrap_err();
        assert!(matches!(err, InvokeError::TimedOut { .. }));
    }
}
