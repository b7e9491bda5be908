//! File transfer to and from a host via the local `scp` / `rsync` binaries.

use log::debug;
use std::path::Path;
use std::process::Command as Process;

use crate::command::Command;
use crate::config::HostConfig;
use crate::error::{Error, Result};
use crate::host::Protocol;
use crate::result::ExecutionResult;

/// Runs `scp` or `rsync` against one configured host.
#[derive(Debug, Clone)]
pub struct ProcessTransfer {
    config: HostConfig,
}

impl ProcessTransfer {
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }

    /// Uploads `local_path` to `remote_path` on the host.
    ///
    /// A missing local source fails with `LocalFileNotFound` before any
    /// process is started.
    pub fn upload(&self, local_path: &Path, remote_path: &str, protocol: Protocol) -> Result<ExecutionResult> {
        if !local_path.exists() {
            return Err(Error::LocalFileNotFound(local_path.to_path_buf()));
        }

        let source = local_path.to_string_lossy().to_string();
        let destination = self.remote_spec(remote_path);
        let command = self.build(protocol, &source, &destination);
        self.run(command)
    }

    /// Downloads `remote_path` from the host into `local_path`.
    pub fn download(&self, remote_path: &str, local_path: &Path, protocol: Protocol) -> Result<ExecutionResult> {
        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(Error::LocalFileNotFound(parent.to_path_buf()));
            }
        }

        let source = self.remote_spec(remote_path);
        let destination = local_path.to_string_lossy().to_string();
        let command = self.build(protocol, &source, &destination);
        self.run(command)
    }

    fn remote_spec(&self, remote_path: &str) -> String {
        format!("{}@{}:{}", self.config.user, self.config.address(), remote_path)
    }

    /// Builds the local command line for a transfer.
    fn build(&self, protocol: Protocol, source: &str, destination: &str) -> Command {
        match protocol {
            Protocol::Scp => {
                let mut args = vec!["-r".to_string(), "-p".to_string()];
                args.extend(self.ssh_options());
                if self.config.port != 22 {
                    // scp takes -P, not -p
                    args.push("-P".to_string());
                    args.push(self.config.port.to_string());
                }
                args.push(source.to_string());
                args.push(destination.to_string());
                Command::new("scp").with_args(args)
            }
            Protocol::Rsync => {
                let mut shell = vec!["ssh".to_string()];
                shell.extend(self.ssh_options());
                shell.push("-p".to_string());
                shell.push(self.config.port.to_string());
                Command::new("rsync").with_args([
                    "-az".to_string(),
                    "-e".to_string(),
                    shell.join(" "),
                    source.to_string(),
                    destination.to_string(),
                ])
            }
        }
    }

    fn ssh_options(&self) -> Vec<String> {
        let mut options = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.timeout),
        ];
        if let Some(key) = self.config.expanded_ssh_key() {
            options.push("-i".to_string());
            options.push(key.to_string_lossy().to_string());
        }
        options
    }

    /// Runs the transfer; a non-zero exit is a remote command failure.
    fn run(&self, command: Command) -> Result<ExecutionResult> {
        debug!("{}: {}", self.config.name, command.cmd_line());

        let output = Process::new(&command.command)
            .args(&command.args)
            .output()
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to start {}: {}", command.command, e),
                ))
            })?;

        let result = ExecutionResult::new(
            self.config.name.clone(),
            command,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
            output.status.code().unwrap_or(-1),
        );

        result.ensure_success()
    }
}
