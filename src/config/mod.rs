//! Host inventory configuration for fleetrun.
//!
//! The inventory lists the machines a run can target, in order, together
//! with their role tags and SSH connection settings.
//!
//! # Configuration File Location
//!
//! The inventory file is stored at:
//! - Linux: `~/.config/fleetrun/hosts.yml`
//! - macOS: `~/Library/Application Support/fleetrun/hosts.yml`
//! - Windows: `C:\Users\<User>\AppData\Roaming\fleetrun\hosts.yml`
//!
//! # Example Configuration
//!
//! ```yaml
//! hosts:
//!   - name: master
//!     hostname: "master.example.com"
//!     user: root
//!     roles: [master, agent, default]
//!   - name: db
//!     hostname: "db.example.com"
//!     user: root
//!     port: 2222
//!     ssh_key: "~/.ssh/id_ed25519"
//!     roles: [database, agent]
//! defaults:
//!   parallel: true
//!   retry:
//!     max_retries: 5
//!     interval: 1.0
//! ```

pub mod credentials;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Default SSH port
const DEFAULT_SSH_PORT: u16 = 22;

/// Default SSH connection timeout in seconds
const DEFAULT_TIMEOUT: u64 = 60;

/// Default number of SSH connection attempts
const DEFAULT_CONNECTION_ATTEMPTS: u32 = 3;

/// Top-level inventory file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Hosts in inventory order
    #[serde(default)]
    pub hosts: Vec<HostConfig>,

    /// Settings that apply when not overridden on the command line
    #[serde(default)]
    pub defaults: DefaultSettings,
}

/// Connection settings and roles for a single host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Inventory name of the host
    pub name: String,

    /// Hostname or IP address (defaults to `name`)
    #[serde(default)]
    pub hostname: Option<String>,

    /// SSH username
    pub user: String,

    /// SSH port (default: 22)
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Path to SSH private key file (optional, falls back to the agent)
    pub ssh_key: Option<String>,

    /// Role tags
    #[serde(default)]
    pub roles: Vec<String>,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Limit on a single command's run time in seconds (unbounded if unset)
    #[serde(default)]
    pub command_timeout: Option<u64>,

    /// How many times to try connecting before giving up
    #[serde(default = "default_connection_attempts")]
    pub connection_attempts: u32,
}

/// Defaults applied by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultSettings {
    /// Fan out across hosts concurrently
    #[serde(default)]
    pub parallel: bool,

    /// Retry policy used by `fleetrun retry`
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT
}

fn default_connection_attempts() -> u32 {
    DEFAULT_CONNECTION_ATTEMPTS
}

impl Config {
    /// Returns the default inventory path for the current platform.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("fleetrun").join("hosts.yml"))
    }

    /// Loads the inventory from the default location.
    ///
    /// Returns `Ok(Config::default())` if no inventory file exists.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    /// Loads the inventory from a specific file path.
    ///
    /// Returns `Ok(Config::default())` if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to read inventory file: {}\n\n\
                     File path: {}\n\n\
                     Suggestions:\n\
                     • Check file permissions: ls -la {}\n\
                     • Verify the file is readable",
                    e,
                    path.display(),
                    path.display()
                ),
            ))
        })?;

        Self::parse(&contents).map_err(|e| {
            Error::Config(format!(
                "Failed to parse inventory file {}: {}\n\n\
                 Suggestions:\n\
                 • Check YAML syntax in the inventory file\n\
                 • Verify indentation uses spaces, not tabs\n\n\
                 Example valid inventory:\n\
                 hosts:\n\
                   - name: master\n\
                     hostname: \"master.example.com\"\n\
                     user: root\n\
                     roles: [master, default]",
                path.display(),
                e
            ))
        })
    }

    /// Parses and validates inventory YAML.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that host names are present and unique and that the retry
    /// interval is a usable number of seconds.
    fn validate(&self) -> Result<()> {
        self.defaults
            .retry
            .validate()
            .map_err(|e| Error::Config(format!("defaults: {}", e)))?;

        for (idx, host) in self.hosts.iter().enumerate() {
            if host.name.trim().is_empty() {
                return Err(Error::Config(format!("host #{} has an empty name", idx + 1)));
            }
            if self.hosts[..idx].iter().any(|h| h.name == host.name) {
                return Err(Error::Config(format!(
                    "host '{}' is listed more than once",
                    host.name
                )));
            }
        }
        Ok(())
    }

    /// Gets a host configuration by name.
    pub fn get_host(&self, name: &str) -> Option<&HostConfig> {
        self.hosts.iter().find(|h| h.name == name)
    }

    /// Returns true if there are no hosts configured.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl HostConfig {
    /// Creates a new host configuration with required fields.
    pub fn new(name: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hostname: None,
            user: user.into(),
            port: DEFAULT_SSH_PORT,
            ssh_key: None,
            roles: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            command_timeout: None,
            connection_attempts: DEFAULT_CONNECTION_ATTEMPTS,
        }
    }

    /// Builder method to set the network hostname.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Builder method to set the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder method to set the SSH key path.
    pub fn with_ssh_key(mut self, key_path: impl Into<String>) -> Self {
        self.ssh_key = Some(key_path.into());
        self
    }

    /// Builder method to set role tags.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the timeout.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder method to bound how long a command may run.
    pub fn with_command_timeout(mut self, seconds: u64) -> Self {
        self.command_timeout = Some(seconds);
        self
    }

    /// The address to connect to.
    pub fn address(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.name)
    }

    /// Returns the SSH connection string (user@host:port).
    pub fn connection_string(&self) -> String {
        if self.port == DEFAULT_SSH_PORT {
            format!("{}@{}", self.user, self.address())
        } else {
            format!("{}@{}:{}", self.user, self.address(), self.port)
        }
    }

    /// Expands the SSH key path, replacing ~ with the home directory.
    pub fn expanded_ssh_key(&self) -> Option<PathBuf> {
        self.ssh_key.as_deref().map(expand_path)
    }
}

/// Expands a leading `~/` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
