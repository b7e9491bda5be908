//! Scoped temporary directories with ownership fixups.
//!
//! A directory is created through the host's own `tmpdir` capability and
//! then optionally handed to a user and, as a separate step, a group. If
//! anything fails after the directory exists it is removed again before
//! the error is returned, so a failed call never leaves a directory behind.

use log::{debug, warn};

use crate::command::{shell_quote, Command};
use crate::dsl::dispatch::DispatchOptions;
use crate::dsl::outcome::OneOrMany;
use crate::dsl::roles::{resolve_hosts, HostSpecifier};
use crate::dsl::HostHelpers;
use crate::error::{AccountKind, Error, Result};
use crate::host::{Host, HostRef};
use crate::result::ExecutionResult;

/// A temporary directory that exists on `host`.
#[derive(Debug, Clone)]
pub struct ResourceHandle {
    pub remote_path: String,
    pub host: HostRef,
    pub owner: Option<String>,
    pub group: Option<String>,
}

pub(crate) fn create_tmpdir_on<C>(
    ctx: &C,
    spec: HostSpecifier,
    prefix: &str,
    user: Option<&str>,
    group: Option<&str>,
) -> Result<OneOrMany<ResourceHandle>>
where
    C: HostHelpers + ?Sized,
{
    let single = spec.is_single();
    let hosts = resolve_hosts(&spec, ctx.hosts())?;

    let mut handles = Vec::with_capacity(hosts.len());
    for host in hosts {
        handles.push(create_one(ctx, host, prefix, user, group)?);
    }

    Ok(OneOrMany::from_values(single, handles))
}

fn create_one<C>(
    ctx: &C,
    host: HostRef,
    prefix: &str,
    user: Option<&str>,
    group: Option<&str>,
) -> Result<ResourceHandle>
where
    C: HostHelpers + ?Sized,
{
    let remote_path = host.tmpdir(prefix)?;
    debug!("Created {} on {}", remote_path, host.name());

    if let Err(e) = assign(ctx, &host, &remote_path, user, group) {
        rollback(ctx, &host, &remote_path);
        return Err(e);
    }

    Ok(ResourceHandle {
        remote_path,
        host,
        owner: user.map(str::to_string),
        group: group.map(str::to_string),
    })
}

/// Ownership then group, as two independent commands.
fn assign<C>(ctx: &C, host: &HostRef, path: &str, user: Option<&str>, group: Option<&str>) -> Result<()>
where
    C: HostHelpers + ?Sized,
{
    if let Some(user) = user {
        ensure_account(host, AccountKind::User, user)?;
        ctx.on(
            host,
            format!("chown {} {}", shell_quote(user), shell_quote(path)),
            &DispatchOptions::default(),
        )?;
    }

    if let Some(group) = group {
        ensure_account(host, AccountKind::Group, group)?;
        ctx.on(
            host,
            format!("chgrp {} {}", shell_quote(group), shell_quote(path)),
            &DispatchOptions::default(),
        )?;
    }

    Ok(())
}

fn ensure_account(host: &HostRef, kind: AccountKind, name: &str) -> Result<()> {
    let lookup = match kind {
        AccountKind::User => host.user_get(name)?,
        AccountKind::Group => host.group_get(name)?,
    };

    if lookup.is_success() {
        Ok(())
    } else {
        Err(Error::MissingAccount {
            kind,
            name: name.to_string(),
            host: host.name().to_string(),
        })
    }
}

fn rollback<C>(ctx: &C, host: &HostRef, path: &str)
where
    C: HostHelpers + ?Sized,
{
    warn!("Removing {} from {} after failed setup", path, host.name());
    if let Err(e) = ctx.on(
        host,
        format!("rmdir {}", shell_quote(path)),
        &DispatchOptions::default(),
    ) {
        warn!("Failed to remove {} from {}: {}", path, host.name(), e);
    }
}

pub(crate) fn remove_tmpdir_on<C>(ctx: &C, handle: &ResourceHandle) -> Result<ExecutionResult>
where
    C: HostHelpers + ?Sized,
{
    ctx.on(
        &handle.host,
        Command::new("rm -rf").with_args([shell_quote(&handle.remote_path)]),
        &DispatchOptions::default(),
    )?
    .into_one()
}
