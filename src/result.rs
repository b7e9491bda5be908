//! Results of running a command on a host.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::command::Command;
use crate::error::{FleetError, Result};
use crate::logger::Logger;

/// Outcome of one command on one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Name of the host that produced this result
    pub host: String,
    /// The command as it was executed (environment already merged)
    pub command: Command,
    /// Standard output from the command
    pub stdout: String,
    /// Standard error from the command
    pub stderr: String,
    /// Exit code (0 for success)
    pub exit_code: i32,
    /// Whether the exit code counts as success
    pub success: bool,
}

impl ExecutionResult {
    /// Creates a result; `success` is `exit_code == 0`.
    pub fn new(
        host: impl Into<String>,
        command: Command,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        Self {
            host: host.into(),
            command,
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            success: exit_code == 0,
        }
    }

    /// Recomputes `success` against an explicit set of acceptable exit codes.
    pub fn with_acceptable_exit_codes(mut self, codes: &BTreeSet<i32>) -> Self {
        self.success = codes.contains(&self.exit_code);
        self
    }

    /// Returns true if the command succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Stdout followed by stderr.
    pub fn output(&self) -> String {
        let mut output = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&self.stderr);
        }
        output
    }

    /// Turns an unsuccessful result into a `CommandFailed` error.
    pub fn ensure_success(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(FleetError::command_failed(self))
        }
    }

    /// Hands this result to a logger for recording.
    pub fn log(&self, logger: &dyn Logger) {
        logger.record(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_result_is_success() {
        let success = ExecutionResult::new("master", Command::new("true"), "ok", "", 0);
        assert!(success.is_success());

        let failure = ExecutionResult::new("master", Command::new("false"), "", "error", 1);
        assert!(!failure.is_success());
    }

    #[test]
    fn test_acceptable_exit_codes_override() {
        let codes: BTreeSet<i32> = [0, 2].into_iter().collect();

        let result = ExecutionResult::new("agent", Command::new("puppet agent -t"), "", "", 2)
            .with_acceptable_exit_codes(&codes);
        assert!(result.is_success());

        let result = ExecutionResult::new("agent", Command::new("puppet agent -t"), "", "", 0)
            .with_acceptable_exit_codes(&[2].into_iter().collect());
        assert!(!result.is_success());
    }

    #[test]
    fn test_ensure_success() {
        let ok = ExecutionResult::new("db", Command::new("true"), "", "", 0);
        assert!(ok.ensure_success().is_ok());

        let bad = ExecutionResult::new("db", Command::new("cat /nope"), "", "No such file", 1);
        match bad.ensure_success() {
            Err(FleetError::CommandFailed { result, .. }) => assert_eq!(result.exit_code, 1),
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_output_joins_streams() {
        let result = ExecutionResult::new("db", Command::new("x"), "out", "err", 0);
        assert_eq!(result.output(), "out\nerr");
    }
}
