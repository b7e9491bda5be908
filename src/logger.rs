//! Best-effort recording of execution results.

use log::{debug, info, warn};

use crate::result::ExecutionResult;

/// Sink that execution results are attached to after each dispatch.
pub trait Logger: Send + Sync {
    fn record(&self, result: &ExecutionResult);
}

/// Writes results through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogLogger;

impl Logger for LogLogger {
    fn record(&self, result: &ExecutionResult) {
        if result.is_success() {
            info!(
                "{} $ {} (exit {})",
                result.host,
                result.command.cmd_line(),
                result.exit_code
            );
        } else {
            warn!(
                "{} $ {} (exit {})",
                result.host,
                result.command.cmd_line(),
                result.exit_code
            );
        }
        if !result.stdout.is_empty() {
            debug!("{} stdout: {}", result.host, result.stdout.trim_end());
        }
        if !result.stderr.is_empty() {
            debug!("{} stderr: {}", result.host, result.stderr.trim_end());
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn record(&self, _result: &ExecutionResult) {}
}
