//! Running commands on resolved hosts, sequentially or fanned out.
//!
//! Every per-host unit runs to completion before anything is returned.
//! Results are placed in resolved-host order no matter which host answers
//! first; logging, the remembered ambient result and caller callbacks all
//! happen on the calling thread as each result arrives.

use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc;

use crate::command::Command;
use crate::dsl::outcome::OneOrMany;
use crate::dsl::roles::{host_names, resolve_hosts, HostSpecifier};
use crate::dsl::HostHelpers;
use crate::error::{Error, HostFailure, Result};
use crate::host::{Host, HostRef};
use crate::result::ExecutionResult;

/// Options accepted by `on` and friends.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Environment overlay merged over the command's own environment
    pub environment: Option<BTreeMap<String, String>>,
    /// Fan out across hosts concurrently
    pub parallel: bool,
    /// Exit codes that count as success (default: just 0)
    pub acceptable_exit_codes: Option<BTreeSet<i32>>,
    /// Return results untouched instead of failing on unacceptable exits
    pub accept_all_exit_codes: bool,
}

impl DispatchOptions {
    /// Builder method to add one environment variable to the overlay.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Builder method to enable parallel fan-out.
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Builder method to set the acceptable exit codes.
    pub fn with_acceptable_exit_codes<I: IntoIterator<Item = i32>>(mut self, codes: I) -> Self {
        self.acceptable_exit_codes = Some(codes.into_iter().collect());
        self
    }

    /// Builder method to disable the exit code check.
    pub fn accept_all_exit_codes(mut self) -> Self {
        self.accept_all_exit_codes = true;
        self
    }
}

/// Per-host callback, invoked as soon as that host's result is available.
pub enum Callback<'a> {
    /// Receives the result directly.
    WithResult(&'a mut dyn FnMut(&ExecutionResult)),
    /// Reads the result through the context's ambient accessors
    /// (`stdout()`, `stderr()`, `exit_code()`).
    Ambient(&'a mut dyn FnMut()),
}

impl Callback<'_> {
    fn invoke(&mut self, result: &ExecutionResult) {
        match self {
            Callback::WithResult(f) => (*f)(result),
            Callback::Ambient(f) => (*f)(),
        }
    }
}

/// `on`: resolve, merge environment, run, shape the return value.
pub(crate) fn dispatch<C>(
    ctx: &C,
    spec: HostSpecifier,
    command: Command,
    opts: &DispatchOptions,
    callback: Option<Callback<'_>>,
) -> Result<OneOrMany<ExecutionResult>>
where
    C: HostHelpers + ?Sized,
{
    if command.command.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "on() must be called with a non-empty command string or a Command".to_string(),
        ));
    }

    let single = spec.is_single();
    let hosts = resolve_hosts(&spec, ctx.hosts())?;
    if hosts.is_empty() {
        warn!("No hosts matched {:?}; nothing to run", spec);
    }

    dispatch_each(ctx, &hosts, single, opts, callback, |_| command.clone())
}

/// Runs a per-host command on every host; `build` receives the host's
/// index in `hosts`.
pub(crate) fn dispatch_each<C, B>(
    ctx: &C,
    hosts: &[HostRef],
    single: bool,
    opts: &DispatchOptions,
    mut callback: Option<Callback<'_>>,
    build: B,
) -> Result<OneOrMany<ExecutionResult>>
where
    C: HostHelpers + ?Sized,
    B: Fn(usize) -> Command + Sync,
{
    let results = fan_out(
        hosts,
        opts.parallel,
        |idx, host| {
            let command = match &opts.environment {
                Some(environment) => build(idx).with_environment(environment),
                None => build(idx),
            };
            execute(host, &command, opts)
        },
        |_, outcome| {
            match outcome {
                Ok(result) => {
                    result.log(ctx.logger());
                    ctx.remember(result);
                    if let Some(callback) = callback.as_mut() {
                        callback.invoke(result);
                    }
                }
                Err(err) => {
                    if let Some(result) = err.result() {
                        result.log(ctx.logger());
                        ctx.remember(result);
                    }
                }
            }
        },
    );

    collect(hosts, results, single)
}

/// One host, one command, with the exit code policy applied.
fn execute(host: &HostRef, command: &Command, opts: &DispatchOptions) -> Result<ExecutionResult> {
    let result = host.exec(command)?;
    let result = match &opts.acceptable_exit_codes {
        Some(codes) => result.with_acceptable_exit_codes(codes),
        None => result,
    };

    if opts.accept_all_exit_codes {
        Ok(result)
    } else {
        result.ensure_success()
    }
}

/// Runs `unit` once per host and returns outcomes in host order.
///
/// With `parallel` and at least two hosts the units run on a dedicated
/// thread pool; if the pool cannot be built this falls back to running
/// them one after another. `on_ready` is always called on the calling
/// thread, once per host, in completion order.
pub(crate) fn fan_out<T, U, R>(
    hosts: &[HostRef],
    parallel: bool,
    unit: U,
    mut on_ready: R,
) -> Vec<Result<T>>
where
    T: Send,
    U: Fn(usize, &HostRef) -> Result<T> + Sync,
    R: FnMut(usize, &Result<T>),
{
    if parallel && hosts.len() >= 2 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(hosts.len())
            .thread_name(|idx| format!("fleetrun-host-{}", idx))
            .build()
        {
            Ok(pool) => {
                debug!("Fanning out to {:?} in parallel", host_names(hosts));
                let mut slots: Vec<Option<Result<T>>> = hosts.iter().map(|_| None).collect();
                let (tx, rx) = mpsc::channel();

                pool.in_place_scope(|scope| {
                    for (idx, host) in hosts.iter().enumerate() {
                        let tx = tx.clone();
                        let unit = &unit;
                        scope.spawn(move |_| {
                            // The receiver outlives the scope
                            let _ = tx.send((idx, unit(idx, host)));
                        });
                    }
                    drop(tx);

                    for (idx, outcome) in rx {
                        on_ready(idx, &outcome);
                        slots[idx] = Some(outcome);
                    }
                });

                return slots.into_iter().flatten().collect();
            }
            Err(e) => warn!("Parallel execution unavailable ({}), running sequentially", e),
        }
    }

    hosts
        .iter()
        .enumerate()
        .map(|(idx, host)| {
            let outcome = unit(idx, host);
            on_ready(idx, &outcome);
            outcome
        })
        .collect()
}

/// Splits outcomes into values or a (possibly aggregated) error.
pub(crate) fn collect<T>(hosts: &[HostRef], results: Vec<Result<T>>, single: bool) -> Result<OneOrMany<T>> {
    let mut values = Vec::with_capacity(results.len());
    let mut failures = Vec::new();

    for (host, outcome) in hosts.iter().zip(results) {
        match outcome {
            Ok(value) => values.push(value),
            Err(error) => failures.push(HostFailure {
                host: host.name().to_string(),
                error,
            }),
        }
    }

    if failures.is_empty() {
        Ok(OneOrMany::from_values(single, values))
    } else {
        Err(Error::from_failures(failures))
    }
}
