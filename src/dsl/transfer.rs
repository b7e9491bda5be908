//! Fan-out of file transfers and remote file creation.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::dsl::dispatch::{collect, fan_out};
use crate::dsl::outcome::OneOrMany;
use crate::dsl::roles::{resolve_hosts, HostSpecifier};
use crate::dsl::HostHelpers;
use crate::error::{Error, Result};
use crate::host::{Host, Protocol};
use crate::result::ExecutionResult;

/// Options for `copy_to` / `copy_from` / `create_remote_file`.
#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    /// Transfer protocol (default: scp)
    pub protocol: Protocol,
    /// Upload to hosts concurrently
    pub parallel: bool,
}

impl TransferOptions {
    pub fn with_protocol(protocol: Protocol) -> Self {
        Self {
            protocol,
            ..Self::default()
        }
    }
}

pub(crate) fn copy_to<C>(
    ctx: &C,
    spec: HostSpecifier,
    local_path: &Path,
    remote_path: &str,
    opts: &TransferOptions,
) -> Result<OneOrMany<ExecutionResult>>
where
    C: HostHelpers + ?Sized,
{
    if !local_path.exists() {
        return Err(Error::LocalFileNotFound(local_path.to_path_buf()));
    }

    let single = spec.is_single();
    let hosts = resolve_hosts(&spec, ctx.hosts())?;

    let results = fan_out(
        &hosts,
        opts.parallel,
        |_, host| host.transfer_to(local_path, remote_path, opts.protocol),
        |_, outcome| log_outcome(ctx, outcome),
    );

    collect(&hosts, results, single)
}

/// Every host writes to the same local path, so this never fans out
/// concurrently.
pub(crate) fn copy_from<C>(
    ctx: &C,
    spec: HostSpecifier,
    remote_path: &str,
    local_path: &Path,
    opts: &TransferOptions,
) -> Result<OneOrMany<ExecutionResult>>
where
    C: HostHelpers + ?Sized,
{
    let single = spec.is_single();
    let hosts = resolve_hosts(&spec, ctx.hosts())?;

    let results = fan_out(
        &hosts,
        false,
        |_, host| host.transfer_from(remote_path, local_path, opts.protocol),
        |_, outcome| log_outcome(ctx, outcome),
    );

    collect(&hosts, results, single)
}

fn log_outcome<C>(ctx: &C, outcome: &Result<ExecutionResult>)
where
    C: HostHelpers + ?Sized,
{
    let result = match outcome {
        Ok(result) => Some(result),
        Err(e) => e.result(),
    };
    if let Some(result) = result {
        result.log(ctx.logger());
    }
}

/// Writes `contents` to a local temp file and uploads it to `remote_path`
/// with the protocol from `opts`.
pub(crate) fn create_remote_file<C>(
    ctx: &C,
    spec: HostSpecifier,
    remote_path: &str,
    contents: &str,
    opts: &TransferOptions,
) -> Result<OneOrMany<ExecutionResult>>
where
    C: HostHelpers + ?Sized,
{
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;

    match opts.protocol {
        Protocol::Rsync => ctx.rsync_to(spec, file.path(), remote_path, opts),
        Protocol::Scp => ctx.scp_to(spec, file.path(), remote_path, opts),
    }
}
