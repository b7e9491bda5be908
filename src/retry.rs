//! Retry logic for remote operations.
//!
//! Two loops live here:
//! - [`retry_with_backoff`] retries transport failures (SSH connects) with
//!   exponential backoff.
//! - [`retry_until_acceptable`] polls a result-returning operation at a
//!   fixed interval until its exit code is acceptable; this backs
//!   `retry_on`.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::result::ExecutionResult;

/// Configuration for transport retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the initial attempt)
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,
    /// Multiplier for exponential backoff (typically 2.0)
    pub backoff_multiplier: f64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 10000,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_retries: u32, initial_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay_ms,
            ..Self::default()
        }
    }

    /// Calculates the delay for a given retry attempt.
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_delay_ms as f64
            * self.backoff_multiplier.powi(attempt as i32))
        .min(self.max_delay_ms as f64) as u64;

        Duration::from_millis(delay_ms)
    }
}

/// Retries an operation with exponential backoff.
///
/// Returns the last error if all retry attempts fail.
pub fn retry_with_backoff<T, F>(config: &RetryConfig, mut operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut last_error = match operation() {
        Ok(result) => return Ok(result),
        Err(e) => {
            debug!("{} failed on initial attempt: {}", operation_name, e);
            e
        }
    };

    for attempt in 1..=config.max_retries {
        let delay = config.calculate_delay(attempt - 1);
        warn!(
            "Retrying {} (attempt {}/{}) after {:?}",
            operation_name, attempt, config.max_retries, delay
        );

        thread::sleep(delay);

        match operation() {
            Ok(result) => {
                debug!("{} succeeded on attempt {}", operation_name, attempt);
                return Ok(result);
            }
            Err(e) => {
                debug!("{} failed on attempt {}: {}", operation_name, attempt, e);
                last_error = e;
            }
        }
    }

    Err(last_error)
}

/// Bounded polling policy for `retry_on`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt; see [`RetryPolicy::max_attempts`]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Seconds to sleep between attempts
    #[serde(default = "default_interval")]
    pub interval: f64,
    /// Exit codes that end the loop successfully
    #[serde(default = "default_acceptable_exit_codes")]
    pub acceptable_exit_codes: BTreeSet<i32>,
}

fn default_max_retries() -> u32 {
    5
}

fn default_interval() -> f64 {
    1.0
}

fn default_acceptable_exit_codes() -> BTreeSet<i32> {
    [0].into_iter().collect()
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            interval: default_interval(),
            acceptable_exit_codes: default_acceptable_exit_codes(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, interval: f64) -> Self {
        Self {
            max_retries,
            interval,
            ..Self::default()
        }
    }

    /// Builder method to replace the acceptable exit codes.
    pub fn with_acceptable_exit_codes<I: IntoIterator<Item = i32>>(mut self, codes: I) -> Self {
        self.acceptable_exit_codes = codes.into_iter().collect();
        self
    }

    /// Total number of calls made before giving up: `max_retries + 2`.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(2)
    }

    /// Rejects intervals that are negative, NaN or infinite.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_finite() && self.interval >= 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "retry interval must be a finite, non-negative number of seconds, got {}",
                self.interval
            )))
        }
    }

    /// Never panics: unusable intervals become zero, huge ones saturate.
    fn sleep_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Calls `operation` until its exit code is acceptable.
///
/// Makes at most [`RetryPolicy::max_attempts`] calls, sleeping
/// `policy.interval` seconds between them. Errors from the operation itself
/// are not retried. When every attempt is unacceptable the last result is
/// returned inside `RetryExhausted`.
pub fn retry_until_acceptable<F>(policy: &RetryPolicy, mut operation: F) -> Result<ExecutionResult>
where
    F: FnMut() -> Result<ExecutionResult>,
{
    let max_attempts = policy.max_attempts();
    let mut attempts = 0;

    loop {
        let result = operation()?;
        attempts += 1;

        if policy.acceptable_exit_codes.contains(&result.exit_code) {
            debug!(
                "'{}' on {} accepted after {} attempt(s)",
                result.command.cmd_line(),
                result.host,
                attempts
            );
            return Ok(result.with_acceptable_exit_codes(&policy.acceptable_exit_codes));
        }

        if attempts >= max_attempts {
            return Err(Error::RetryExhausted {
                attempts,
                result: Box::new(result),
            });
        }

        debug!(
            "'{}' on {} exited {} (attempt {}/{}), retrying in {}s",
            result.command.cmd_line(),
            result.host,
            result.exit_code,
            attempts,
            max_attempts,
            policy.interval
        );
        thread::sleep(policy.sleep_interval());
    }
}

/// Provides helpful diagnostic information for SSH connection failures.
pub fn diagnose_ssh_error(error: &Error, host: &str, port: u16, ssh_key: Option<&str>) -> String {
    let error_str = error.to_string().to_lowercase();

    let mut suggestions = Vec::new();

    if error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("no route to host")
    {
        suggestions.push(format!("• Verify the host '{}' is reachable", host));
        suggestions.push(format!(
            "• Check if SSH is running on port {} (try: ssh -p {} {})",
            port, port, host
        ));
    }

    if error_str.contains("authentication")
        || error_str.contains("permission denied")
        || error_str.contains("publickey")
    {
        match ssh_key {
            Some(key) => {
                suggestions.push(format!("• Check that the SSH key exists: {}", key));
                suggestions.push(format!(
                    "• Verify the public key is in ~/.ssh/authorized_keys on {}",
                    host
                ));
            }
            None => {
                suggestions.push("• Set ssh_key for this host in the inventory".to_string());
                suggestions.push("• Verify your SSH agent is running (ssh-add -l)".to_string());
            }
        }
    }

    if suggestions.is_empty() {
        suggestions.push(format!(
            "• Test the connection manually: ssh -p {} {}",
            port, host
        ));
    }

    format!(
        "SSH connection failed: {}\n\nTroubleshooting suggestions:\n{}",
        error,
        suggestions.join("\n")
    )
}
