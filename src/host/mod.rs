//! The host capability surface the dispatch core is built on.
//!
//! A [`Host`] is owned outside this crate for the whole run; the core only
//! holds shared references ([`HostRef`]) and treats each capability as an
//! opaque, thread-safe black box. [`ssh::SshHost`] is the concrete
//! implementation used by the CLI.

pub mod ssh;
pub mod transfer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::command::Command;
use crate::error::{FleetError, Result};
use crate::result::ExecutionResult;

/// Protocol used to move files between the local machine and a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain copy (`scp`)
    #[default]
    Scp,
    /// Sync copy (`rsync`)
    Rsync,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Scp => write!(f, "scp"),
            Protocol::Rsync => write!(f, "rsync"),
        }
    }
}

impl FromStr for Protocol {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "scp" => Ok(Protocol::Scp),
            "rsync" => Ok(Protocol::Rsync),
            other => Err(FleetError::InvalidArgument(format!(
                "unknown transfer protocol '{}', expected 'scp' or 'rsync'",
                other
            ))),
        }
    }
}

/// A machine commands and files can be sent to.
pub trait Host: Send + Sync {
    /// Unique name of the host within the inventory.
    fn name(&self) -> &str;

    /// Role tags attached to the host.
    fn roles(&self) -> &[String];

    /// Runs a command and returns its result untouched, whatever the exit
    /// code. Errors are reserved for transport failures.
    fn exec(&self, command: &Command) -> Result<ExecutionResult>;

    /// Copies a local file or directory to `remote_path`.
    ///
    /// Fails with `LocalFileNotFound` before contacting the host when the
    /// source is missing, and with `CommandFailed` for remote-side problems.
    fn transfer_to(&self, local_path: &Path, remote_path: &str, protocol: Protocol)
        -> Result<ExecutionResult>;

    /// Copies `remote_path` from the host to a local path.
    fn transfer_from(&self, remote_path: &str, local_path: &Path, protocol: Protocol)
        -> Result<ExecutionResult>;

    /// Creates a uniquely named temporary directory and returns its path.
    fn tmpdir(&self, prefix: &str) -> Result<String>;

    /// Looks up a user account; the result succeeds iff the user exists.
    fn user_get(&self, name: &str) -> Result<ExecutionResult>;

    /// Looks up a group; the result succeeds iff the group exists.
    fn group_get(&self, name: &str) -> Result<ExecutionResult>;

    /// Case-insensitive role membership.
    fn has_role(&self, role: &str) -> bool {
        self.roles().iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

/// Shared handle to an externally owned host.
pub type HostRef = Arc<dyn Host>;

impl fmt::Debug for dyn Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("name", &self.name())
            .field("roles", &self.roles())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse() {
        assert_eq!("scp".parse::<Protocol>().unwrap(), Protocol::Scp);
        assert_eq!("RSYNC".parse::<Protocol>().unwrap(), Protocol::Rsync);
        assert!(matches!(
            "ftp".parse::<Protocol>(),
            Err(FleetError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_protocol_default_is_scp() {
        assert_eq!(Protocol::default(), Protocol::Scp);
        assert_eq!(Protocol::Rsync.to_string(), "rsync");
    }
}
