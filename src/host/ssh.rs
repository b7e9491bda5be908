//! SSH-backed [`Host`] implementation.
//!
//! Commands run over an `ssh2` session opened per call (with connection
//! retry); file transfers go through [`ProcessTransfer`].

use log::{debug, warn};
use ssh2::{Channel, Session};
use std::io::{ErrorKind, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::command::{shell_quote, Command};
use crate::config::HostConfig;
use crate::error::{Error, Result};
use crate::host::transfer::ProcessTransfer;
use crate::host::{Host, Protocol};
use crate::result::ExecutionResult;
use crate::retry::{diagnose_ssh_error, retry_with_backoff, RetryConfig};

/// `Command` option key that requests a pseudo-terminal.
pub const PTY_OPTION: &str = "pty";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A remote machine reached over SSH.
pub struct SshHost {
    config: HostConfig,
    retry_config: RetryConfig,
    transfer: ProcessTransfer,
}

impl SshHost {
    pub fn new(config: HostConfig) -> Self {
        let retry_config = RetryConfig::new(config.connection_attempts.saturating_sub(1), 1000);
        let transfer = ProcessTransfer::new(config.clone());
        Self {
            config,
            retry_config,
            transfer,
        }
    }

    /// Establishes an SSH connection to the host with automatic retry.
    fn connect(&self) -> Result<Session> {
        let connection_str = format!("SSH connection to {}", self.config.connection_string());

        retry_with_backoff(&self.retry_config, || self.connect_once(), &connection_str).map_err(|e| {
            Error::Transport(diagnose_ssh_error(
                &e,
                self.config.address(),
                self.config.port,
                self.config.ssh_key.as_deref(),
            ))
        })
    }

    /// Attempts to establish an SSH connection once (without retry).
    fn connect_once(&self) -> Result<Session> {
        debug!("Attempting SSH connection to {}", self.config.connection_string());

        let addr = (self.config.address(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| {
                Error::Transport(format!(
                    "Failed to resolve host '{}': {}",
                    self.config.address(),
                    e
                ))
            })?
            .next()
            .ok_or_else(|| {
                Error::Transport(format!(
                    "No addresses found for host '{}'",
                    self.config.address()
                ))
            })?;

        let timeout = Duration::from_secs(self.config.timeout);
        let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            Error::Transport(format!("Failed to connect to {}: {}", self.config.address(), e))
        })?;

        let mut sess = Session::new()
            .map_err(|e| Error::Transport(format!("Failed to create SSH session: {}", e)))?;
        sess.set_tcp_stream(tcp);
        // Bounds handshake and auth only; commands may stay silent for longer
        sess.set_timeout(duration_millis(timeout));
        sess.handshake()
            .map_err(|e| Error::Transport(format!("SSH handshake failed: {}", e)))?;

        self.authenticate(&sess)?;
        sess.set_timeout(0);
        Ok(sess)
    }

    /// Authenticates with the configured key, falling back to the agent.
    fn authenticate(&self, sess: &Session) -> Result<()> {
        if let Some(key_path) = self.config.expanded_ssh_key() {
            match sess.userauth_pubkey_file(&self.config.user, None, &key_path, None) {
                Ok(()) => return Ok(()),
                Err(e) => warn!("Public key authentication failed: {}", e),
            }
        }

        match sess.userauth_agent(&self.config.user) {
            Ok(()) => return Ok(()),
            Err(e) => warn!("Agent authentication failed: {}", e),
        }

        Err(Error::Transport(format!(
            "SSH authentication failed for user {}. Tried: {}, agent",
            self.config.user,
            self.config.ssh_key.as_deref().unwrap_or("no key specified")
        )))
    }

    /// Runs a command line and captures its output and exit status.
    fn run(&self, command: Command) -> Result<ExecutionResult> {
        let cmd_line = command.cmd_line();
        debug!("{} $ {}", self.config.name, cmd_line);

        let sess = self.connect()?;
        let mut channel = sess
            .channel_session()
            .map_err(|e| Error::Transport(format!("Failed to open channel: {}", e)))?;
        if wants_pty(&command) {
            channel
                .request_pty("xterm", None, None)
                .map_err(|e| Error::Transport(format!("Failed to request a pty: {}", e)))?;
        }
        channel
            .exec(&cmd_line)
            .map_err(|e| Error::Transport(format!("Failed to execute command: {}", e)))?;

        let (stdout, stderr) = self.drain(&sess, &mut channel)?;

        channel
            .wait_close()
            .map_err(|e| Error::Transport(format!("Failed to close channel: {}", e)))?;
        let exit_code = channel
            .exit_status()
            .map_err(|e| Error::Transport(format!("Failed to get exit status: {}", e)))?;

        debug!("{} exit code: {}", self.config.name, exit_code);
        Ok(ExecutionResult::new(
            self.config.name.clone(),
            command,
            String::from_utf8_lossy(&stdout),
            String::from_utf8_lossy(&stderr),
            exit_code,
        ))
    }

    /// Reads stdout and stderr side by side until the remote end sends EOF.
    fn drain(&self, sess: &Session, channel: &mut Channel) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut err_stream = channel.stderr();
        let started = Instant::now();

        sess.set_blocking(false);
        let outcome = loop {
            let got_out = match read_available(channel, &mut stdout) {
                Ok(n) => n,
                Err(e) => break Err(e),
            };
            let got_err = match read_available(&mut err_stream, &mut stderr) {
                Ok(n) => n,
                Err(e) => break Err(e),
            };

            if channel.eof() && got_out == 0 && got_err == 0 {
                break Ok(());
            }

            if let Some(limit) = self.config.command_timeout {
                if started.elapsed() > Duration::from_secs(limit) {
                    break Err(Error::Transport(format!(
                        "Command on {} did not finish within {}s",
                        self.config.name, limit
                    )));
                }
            }

            if got_out == 0 && got_err == 0 {
                thread::sleep(POLL_INTERVAL);
            }
        };
        sess.set_blocking(true);

        outcome.map(|()| (stdout, stderr))
    }
}

/// Reads whatever is buffered without blocking; returns the byte count.
fn read_available<R: Read>(reader: &mut R, buf: &mut Vec<u8>) -> Result<usize> {
    let mut chunk = [0u8; 8192];
    let mut total = 0;
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(total),
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                total += n;
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(total),
            Err(e) => return Err(e.into()),
        }
    }
}

/// The `pty` option asks for a pseudo-terminal (e.g. for `sudo` with
/// `requiretty`).
fn wants_pty(command: &Command) -> bool {
    matches!(
        command.options.get(PTY_OPTION).map(|v| v.to_ascii_lowercase()).as_deref(),
        Some("true" | "yes" | "1")
    )
}

fn duration_millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

impl Host for SshHost {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn roles(&self) -> &[String] {
        &self.config.roles
    }

    fn exec(&self, command: &Command) -> Result<ExecutionResult> {
        self.run(command.clone())
    }

    fn transfer_to(&self, local_path: &Path, remote_path: &str, protocol: Protocol) -> Result<ExecutionResult> {
        self.transfer.upload(local_path, remote_path, protocol)
    }

    fn transfer_from(&self, remote_path: &str, local_path: &Path, protocol: Protocol) -> Result<ExecutionResult> {
        self.transfer.download(remote_path, local_path, protocol)
    }

    fn tmpdir(&self, prefix: &str) -> Result<String> {
        let path = format!("/tmp/{}.{}", prefix, Uuid::new_v4().simple());
        self.run(Command::new("mkdir").with_args(["-p".to_string(), shell_quote(&path)]))?
            .ensure_success()?;
        Ok(path)
    }

    fn user_get(&self, name: &str) -> Result<ExecutionResult> {
        self.run(Command::new("getent passwd").with_args([shell_quote(name)]))
    }

    fn group_get(&self, name: &str) -> Result<ExecutionResult> {
        self.run(Command::new("getent group").with_args([shell_quote(name)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_host_identity() {
        let host = SshHost::new(
            HostConfig::new("master", "root").with_roles(["master", "Default"]),
        );
        assert_eq!(host.name(), "master");
        assert!(host.has_role("default"));
        assert!(!host.has_role("database"));
    }

    #[test]
    fn test_connection_attempts_become_retries() {
        let mut config = HostConfig::new("db", "root");
        config.connection_attempts = 4;
        let host = SshHost::new(config);
        assert_eq!(host.retry_config.max_retries, 3);
    }

    #[test]
    fn test_pty_option() {
        assert!(!wants_pty(&Command::new("sudo true")));
        assert!(wants_pty(&Command::new("sudo true").with_option(PTY_OPTION, "true")));
        assert!(wants_pty(&Command::new("sudo true").with_option(PTY_OPTION, "YES")));
        assert!(!wants_pty(&Command::new("sudo true").with_option(PTY_OPTION, "no")));
    }

    #[test]
    fn test_read_available_collects_everything_buffered() {
        let mut reader: &[u8] = b"line one\nline two\n";
        let mut buf = Vec::new();
        assert_eq!(read_available(&mut reader, &mut buf).unwrap(), 18);
        assert_eq!(buf, b"line one\nline two\n");
        assert_eq!(read_available(&mut reader, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_duration_millis_saturates() {
        assert_eq!(duration_millis(Duration::from_secs(60)), 60_000);
        assert_eq!(duration_millis(Duration::from_secs(u64::MAX)), u32::MAX);
    }

    #[test]
    fn test_missing_local_file_is_reported_without_connecting() {
        let host = SshHost::new(HostConfig::new("unreachable.invalid", "root"));
        let err = host
            .transfer_to(Path::new("/non/existent/file.txt"), "/tmp", Protocol::Scp)
            .unwrap_err();
        assert!(matches!(err, Error::LocalFileNotFound(_)));
    }
}
