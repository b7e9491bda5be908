use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::result::ExecutionResult;

/// Which kind of account a resource-lifecycle check was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    User,
    Group,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::User => write!(f, "User"),
            AccountKind::Group => write!(f, "Group"),
        }
    }
}

/// One host's failure inside a fan-out.
#[derive(Debug)]
pub struct HostFailure {
    pub host: String,
    pub error: FleetError,
}

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Local file not found: {}", .0.display())]
    LocalFileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{message}")]
    CommandFailed {
        message: String,
        result: Box<ExecutionResult>,
    },

    #[error("{kind} {name} does not exist on {host}")]
    MissingAccount {
        kind: AccountKind,
        name: String,
        host: String,
    },

    #[error("Command '{}' on {} failed after {attempts} attempts (last exit code {})",
        .result.command.cmd_line(), .result.host, .result.exit_code)]
    RetryExhausted {
        attempts: u32,
        result: Box<ExecutionResult>,
    },

    #[error("{} host(s) failed: {}", .0.len(), format_failures(.0))]
    Aggregate(Vec<HostFailure>),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn format_failures(failures: &[HostFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{}] {}", f.host, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl FleetError {
    /// Builds a `CommandFailed` error from an unacceptable result.
    pub fn command_failed(result: ExecutionResult) -> Self {
        let message = format!(
            "Host '{}' exited with {} running:\n {}\n\nLast 10 lines of output were:\n{}",
            result.host,
            result.exit_code,
            result.command.cmd_line(),
            tail_lines(&result.output(), 10)
        );
        FleetError::CommandFailed {
            message,
            result: Box::new(result),
        }
    }

    /// The result attached to this error, if it carries one.
    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            FleetError::CommandFailed { result, .. } | FleetError::RetryExhausted { result, .. } => {
                Some(result)
            }
            _ => None,
        }
    }

    /// Collapses per-host failures: one failure surfaces as itself, more
    /// become an `Aggregate`.
    pub fn from_failures(mut failures: Vec<HostFailure>) -> Self {
        if failures.len() == 1 {
            failures.remove(0).error
        } else {
            FleetError::Aggregate(failures)
        }
    }
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..]
        .iter()
        .map(|l| format!("\t{}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Error = FleetError;
pub type Result<T> = std::result::Result<T, Error>;
