//! Host helpers: the operations test code uses to drive a fleet.
//!
//! [`HostHelpers`] is a capability trait. An implementor supplies the
//! host inventory and a logger (and optionally somewhere to remember the
//! last result); every operation comes as a provided method. Provided
//! methods call each other through `self`, so an implementor can override
//! `on` or `scp_to` and the higher-level helpers pick that up.
//!
//! [`Fleet`] is the ready-made implementor used by the CLI.

pub mod dispatch;
pub mod outcome;
pub mod roles;
pub mod script;
pub mod tmpdir;
pub mod transfer;

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::command::Command;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::host::ssh::SshHost;
use crate::host::{Host, HostRef, Protocol};
use crate::logger::{LogLogger, Logger};
use crate::result::ExecutionResult;
use crate::retry::{retry_until_acceptable, RetryPolicy};

pub use dispatch::{Callback, DispatchOptions};
pub use outcome::OneOrMany;
pub use roles::{resolve_hosts, HostSpecifier};
pub use tmpdir::ResourceHandle;
pub use transfer::TransferOptions;

/// Role carried by the host that `shell` and `run_script` target.
pub const DEFAULT_ROLE: &str = "default";

pub trait HostHelpers {
    /// The active inventory, in order.
    fn hosts(&self) -> &[HostRef];

    /// Where execution results are recorded.
    fn logger(&self) -> &dyn Logger;

    /// Stores the most recent result for the ambient accessors.
    fn remember(&self, _result: &ExecutionResult) {}

    /// The most recent result, if any was remembered.
    fn last_result(&self) -> Option<ExecutionResult> {
        None
    }

    fn stdout(&self) -> String {
        self.last_result().map(|r| r.stdout).unwrap_or_default()
    }

    fn stderr(&self) -> String {
        self.last_result().map(|r| r.stderr).unwrap_or_default()
    }

    fn exit_code(&self) -> Option<i32> {
        self.last_result().map(|r| r.exit_code)
    }

    /// The host tagged `default`, else the first host.
    fn default_host(&self) -> Result<HostRef> {
        let hosts = self.hosts();
        hosts
            .iter()
            .find(|h| h.has_role(DEFAULT_ROLE))
            .or_else(|| hosts.first())
            .cloned()
            .ok_or_else(|| Error::InvalidArgument("the host inventory is empty".to_string()))
    }

    /// Resolves a specifier against [`HostHelpers::hosts`].
    fn resolve<S: Into<HostSpecifier>>(&self, spec: S) -> Result<Vec<HostRef>> {
        resolve_hosts(&spec.into(), self.hosts())
    }

    /// Runs `command` on every host `spec` designates.
    ///
    /// A single host yields [`OneOrMany::One`]; lists and roles yield
    /// [`OneOrMany::Many`] in resolved order. Unacceptable exit codes fail
    /// with `CommandFailed` unless `opts.accept_all_exit_codes` is set.
    fn on<S, C>(&self, spec: S, command: C, opts: &DispatchOptions) -> Result<OneOrMany<ExecutionResult>>
    where
        S: Into<HostSpecifier>,
        C: Into<Command>,
    {
        dispatch::dispatch(self, spec.into(), command.into(), opts, None)
    }

    /// [`HostHelpers::on`] with a callback run once per host result.
    fn on_each<S, C>(
        &self,
        spec: S,
        command: C,
        opts: &DispatchOptions,
        callback: Callback<'_>,
    ) -> Result<OneOrMany<ExecutionResult>>
    where
        S: Into<HostSpecifier>,
        C: Into<Command>,
    {
        dispatch::dispatch(self, spec.into(), command.into(), opts, Some(callback))
    }

    /// Runs `command` on the default host.
    fn shell<C: Into<Command>>(&self, command: C, opts: &DispatchOptions) -> Result<ExecutionResult> {
        let host = self.default_host()?;
        self.on(host, command, opts)?.into_one()
    }

    /// Re-runs `command` until its exit code is acceptable.
    ///
    /// Makes up to `policy.max_retries + 2` calls to [`HostHelpers::on`],
    /// sleeping `policy.interval` seconds between them, and fails with
    /// `RetryExhausted` carrying the last result.
    fn retry_on<S, C>(&self, spec: S, command: C, policy: &RetryPolicy) -> Result<ExecutionResult>
    where
        S: Into<HostSpecifier>,
        C: Into<Command>,
    {
        let hosts = self.resolve(spec)?;
        let host = match hosts.as_slice() {
            [host] => Arc::clone(host),
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "retry_on needs exactly one host, got {}",
                    hosts.len()
                )))
            }
        };

        let command = command.into();
        let opts = DispatchOptions::default().accept_all_exit_codes();
        retry_until_acceptable(policy, || self.on(&host, &command, &opts)?.into_one())
    }

    /// Creates a uniquely named temp directory on each host, optionally
    /// owned by `user` and `group`.
    fn create_tmpdir_on<S: Into<HostSpecifier>>(
        &self,
        spec: S,
        prefix: &str,
        user: Option<&str>,
        group: Option<&str>,
    ) -> Result<OneOrMany<ResourceHandle>> {
        tmpdir::create_tmpdir_on(self, spec.into(), prefix, user, group)
    }

    /// Deletes a directory made by [`HostHelpers::create_tmpdir_on`].
    fn remove_tmpdir_on(&self, handle: &ResourceHandle) -> Result<ExecutionResult> {
        tmpdir::remove_tmpdir_on(self, handle)
    }

    fn copy_to<S: Into<HostSpecifier>>(
        &self,
        spec: S,
        local_path: &Path,
        remote_path: &str,
        opts: &TransferOptions,
    ) -> Result<OneOrMany<ExecutionResult>> {
        transfer::copy_to(self, spec.into(), local_path, remote_path, opts)
    }

    fn copy_from<S: Into<HostSpecifier>>(
        &self,
        spec: S,
        remote_path: &str,
        local_path: &Path,
        opts: &TransferOptions,
    ) -> Result<OneOrMany<ExecutionResult>> {
        transfer::copy_from(self, spec.into(), remote_path, local_path, opts)
    }

    fn scp_to<S: Into<HostSpecifier>>(
        &self,
        spec: S,
        local_path: &Path,
        remote_path: &str,
        opts: &TransferOptions,
    ) -> Result<OneOrMany<ExecutionResult>> {
        let opts = TransferOptions {
            protocol: Protocol::Scp,
            ..opts.clone()
        };
        self.copy_to(spec, local_path, remote_path, &opts)
    }

    fn scp_from<S: Into<HostSpecifier>>(
        &self,
        spec: S,
        remote_path: &str,
        local_path: &Path,
        opts: &TransferOptions,
    ) -> Result<OneOrMany<ExecutionResult>> {
        let opts = TransferOptions {
            protocol: Protocol::Scp,
            ..opts.clone()
        };
        self.copy_from(spec, remote_path, local_path, &opts)
    }

    fn rsync_to<S: Into<HostSpecifier>>(
        &self,
        spec: S,
        local_path: &Path,
        remote_path: &str,
        opts: &TransferOptions,
    ) -> Result<OneOrMany<ExecutionResult>> {
        let opts = TransferOptions {
            protocol: Protocol::Rsync,
            ..opts.clone()
        };
        self.copy_to(spec, local_path, remote_path, &opts)
    }

    /// Writes `contents` to `remote_path` on each host via `scp_to` or,
    /// with `Protocol::Rsync`, via `rsync_to`.
    fn create_remote_file<S: Into<HostSpecifier>>(
        &self,
        spec: S,
        remote_path: &str,
        contents: &str,
        opts: &TransferOptions,
    ) -> Result<OneOrMany<ExecutionResult>> {
        transfer::create_remote_file(self, spec.into(), remote_path, contents, opts)
    }

    fn run_script_on<S: Into<HostSpecifier>>(
        &self,
        spec: S,
        local_script: &Path,
        opts: &DispatchOptions,
    ) -> Result<OneOrMany<ExecutionResult>> {
        script::run_script_on(self, spec.into(), local_script, opts)
    }

    /// Runs a local script on the default host.
    fn run_script(&self, local_script: &Path, opts: &DispatchOptions) -> Result<ExecutionResult> {
        let host = self.default_host()?;
        self.run_script_on(host, local_script, opts)?.into_one()
    }
}

/// A host inventory plus a logger.
pub struct Fleet {
    hosts: Vec<HostRef>,
    logger: Arc<dyn Logger>,
    last_result: Mutex<Option<ExecutionResult>>,
}

impl Fleet {
    /// Creates a fleet that logs through the `log` facade.
    pub fn new(hosts: Vec<HostRef>) -> Self {
        Self::with_logger(hosts, Arc::new(LogLogger))
    }

    pub fn with_logger(hosts: Vec<HostRef>, logger: Arc<dyn Logger>) -> Self {
        Self {
            hosts,
            logger,
            last_result: Mutex::new(None),
        }
    }

    /// Builds SSH hosts for every inventory entry.
    pub fn from_config(config: &Config) -> Self {
        let hosts = config
            .hosts
            .iter()
            .map(|h| Arc::new(SshHost::new(h.clone())) as HostRef)
            .collect();
        Self::new(hosts)
    }

    /// Looks up a host by name.
    pub fn host(&self, name: &str) -> Option<HostRef> {
        self.hosts.iter().find(|h| h.name() == name).cloned()
    }

    /// Interprets a command-line target: a host name, a comma-separated
    /// list of host names, or otherwise a role tag.
    pub fn target(&self, target: &str) -> Result<HostSpecifier> {
        if let Some(host) = self.host(target) {
            return Ok(HostSpecifier::Single(host));
        }

        if target.contains(',') {
            let hosts = target
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| {
                    self.host(name).ok_or_else(|| {
                        Error::InvalidArgument(format!("no host named '{}' in the inventory", name))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(HostSpecifier::List(hosts));
        }

        Ok(HostSpecifier::role(target))
    }
}

impl HostHelpers for Fleet {
    fn hosts(&self) -> &[HostRef] {
        &self.hosts
    }

    fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    fn remember(&self, result: &ExecutionResult) {
        if let Ok(mut last) = self.last_result.lock() {
            *last = Some(result.clone());
        }
    }

    fn last_result(&self) -> Option<ExecutionResult> {
        self.last_result.lock().ok().and_then(|last| last.clone())
    }
}
