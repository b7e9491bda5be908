//! Upload a local script and run it on hosts.

use log::info;
use std::path::Path;

use crate::command::{shell_quote, Command};
use crate::dsl::dispatch::{dispatch_each, DispatchOptions};
use crate::dsl::outcome::OneOrMany;
use crate::dsl::roles::{resolve_hosts, HostSpecifier};
use crate::dsl::transfer::TransferOptions;
use crate::dsl::HostHelpers;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::result::ExecutionResult;

const SCRIPT_DIR_PREFIX: &str = "fleetrun-script";

/// Stages the script in a fresh temp directory on every host, then runs
/// it. Nothing runs unless every upload succeeded. The staging
/// directories are left in place.
pub(crate) fn run_script_on<C>(
    ctx: &C,
    spec: HostSpecifier,
    local_script: &Path,
    opts: &DispatchOptions,
) -> Result<OneOrMany<ExecutionResult>>
where
    C: HostHelpers + ?Sized,
{
    if !local_script.exists() {
        return Err(Error::LocalFileNotFound(local_script.to_path_buf()));
    }
    let file_name = local_script
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| {
            Error::InvalidArgument(format!("{} is not a script file", local_script.display()))
        })?;

    let single = spec.is_single();
    let hosts = resolve_hosts(&spec, ctx.hosts())?;

    let mut staged = Vec::with_capacity(hosts.len());
    for host in &hosts {
        let dir = ctx
            .create_tmpdir_on(host, SCRIPT_DIR_PREFIX, None, None)?
            .into_one()?;
        let remote_path = format!("{}/{}", dir.remote_path, file_name);
        ctx.scp_to(host, local_script, &remote_path, &TransferOptions::default())?;
        info!("Staged {} on {} at {}", file_name, host.name(), remote_path);
        staged.push(remote_path);
    }

    dispatch_each(ctx, &hosts, single, opts, None, |idx| {
        Command::new(shell_quote(&staged[idx]))
    })
}
