//! fleetrun: the execution core for driving acceptance tests across a
//! fleet of remote machines.
//!
//! - [`dsl`] resolves host specifiers and dispatches commands, retries,
//!   transfers, scoped temp directories and scripts.
//! - [`host`] defines the per-host capability surface and an SSH-backed
//!   implementation.
//! - [`config`] loads the host inventory and credential files.

pub mod command;
pub mod config;
pub mod dsl;
pub mod error;
pub mod host;
pub mod logger;
pub mod result;
pub mod retry;

pub use command::Command;
pub use dsl::{
    Callback, DispatchOptions, Fleet, HostHelpers, HostSpecifier, OneOrMany, ResourceHandle,
    TransferOptions,
};
pub use error::{Error, FleetError, Result};
pub use host::{Host, HostRef, Protocol};
pub use logger::{LogLogger, Logger, NullLogger};
pub use result::ExecutionResult;
pub use retry::RetryPolicy;
