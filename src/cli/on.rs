//! `fleetrun on`: run a command on hosts.

use anyhow::Result;
use clap::Args;

use fleetrun::{Command, DispatchOptions, HostHelpers};

use super::{fleet_from, parse_env_pair, print_results, FleetArgs};

#[derive(Args)]
#[command(about = "Run a command on a host, a comma-separated host list, or a role")]
pub struct OnCommand {
    /// Host name, comma-separated host names, or role tag
    pub target: String,

    /// Command to run (everything after the target)
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// Environment variable for the command (KEY=VALUE, repeatable)
    #[arg(short, long = "env", value_parser = parse_env_pair)]
    pub environment: Vec<(String, String)>,

    /// Run on all hosts concurrently
    #[arg(short, long)]
    pub parallel: bool,

    /// Exit code that counts as success (repeatable, default: 0)
    #[arg(long = "accept-exit-code")]
    pub acceptable_exit_codes: Vec<i32>,

    /// Never fail on the remote exit code
    #[arg(long)]
    pub accept_all: bool,

    #[command(flatten)]
    pub fleet: FleetArgs,
}

impl OnCommand {
    pub fn execute(&self) -> Result<()> {
        let config = self.fleet.load_config()?;
        let fleet = fleet_from(&config)?;
        let spec = fleet.target(&self.target)?;

        let opts = self.options(config.defaults.parallel);
        let results = fleet.on(spec, Command::new(self.command.join(" ")), &opts)?;
        print_results(&results, self.fleet.json)
    }

    fn options(&self, parallel_by_default: bool) -> DispatchOptions {
        let mut opts = DispatchOptions::default();
        for (key, value) in &self.environment {
            opts = opts.with_env(key, value);
        }
        if self.parallel || parallel_by_default {
            opts = opts.parallel();
        }
        if !self.acceptable_exit_codes.is_empty() {
            opts = opts.with_acceptable_exit_codes(self.acceptable_exit_codes.iter().copied());
        }
        if self.accept_all {
            opts = opts.accept_all_exit_codes();
        }
        opts
    }
}
