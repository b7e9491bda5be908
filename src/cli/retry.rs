//! `fleetrun retry`: re-run a command until it exits acceptably.

use anyhow::Result;
use clap::Args;

use fleetrun::{Command, HostHelpers, RetryPolicy};

use super::{fleet_from, print_result, FleetArgs};

#[derive(Args)]
#[command(about = "Re-run a command on one host until its exit code is acceptable")]
pub struct RetryCommand {
    /// Host name or a role matching exactly one host
    pub target: String,

    /// Command to run (everything after the target)
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// Retries after the first two attempts (default: from the inventory, else 5)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Seconds to sleep between attempts (default: from the inventory, else 1)
    #[arg(long)]
    pub interval: Option<f64>,

    /// Exit code that counts as success (repeatable, default: 0)
    #[arg(long = "accept-exit-code")]
    pub acceptable_exit_codes: Vec<i32>,

    #[command(flatten)]
    pub fleet: FleetArgs,
}

impl RetryCommand {
    pub fn execute(&self) -> Result<()> {
        let config = self.fleet.load_config()?;
        let mut policy: RetryPolicy = config.defaults.retry.clone();
        if let Some(max_retries) = self.max_retries {
            policy.max_retries = max_retries;
        }
        if let Some(interval) = self.interval {
            policy.interval = interval;
        }
        if !self.acceptable_exit_codes.is_empty() {
            policy = policy.with_acceptable_exit_codes(self.acceptable_exit_codes.iter().copied());
        }

        policy.validate()?;

        let fleet = fleet_from(&config)?;
        let spec = fleet.target(&self.target)?;
        let result = fleet.retry_on(spec, Command::new(self.command.join(" ")), &policy)?;

        if self.fleet.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_result(&result);
        }
        Ok(())
    }
}
