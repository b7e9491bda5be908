//! `fleetrun run-script`: upload and execute a local script.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use fleetrun::{DispatchOptions, HostHelpers};

use super::{fleet_from, parse_env_pair, print_result, print_results, FleetArgs};

#[derive(Args)]
#[command(about = "Upload a local script to hosts and run it there")]
pub struct ScriptCommand {
    /// Local script to upload
    pub script: PathBuf,

    /// Host name, comma-separated host names, or role tag (default: the default host)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Environment variable for the script (KEY=VALUE, repeatable)
    #[arg(short, long = "env", value_parser = parse_env_pair)]
    pub environment: Vec<(String, String)>,

    /// Run on all hosts concurrently
    #[arg(short, long)]
    pub parallel: bool,

    #[command(flatten)]
    pub fleet: FleetArgs,
}

impl ScriptCommand {
    pub fn execute(&self) -> Result<()> {
        let config = self.fleet.load_config()?;
        let fleet = fleet_from(&config)?;

        let mut opts = DispatchOptions::default();
        for (key, value) in &self.environment {
            opts = opts.with_env(key, value);
        }
        if self.parallel || config.defaults.parallel {
            opts = opts.parallel();
        }

        match &self.target {
            Some(target) => {
                let spec = fleet.target(target)?;
                let results = fleet.run_script_on(spec, &self.script, &opts)?;
                print_results(&results, self.fleet.json)
            }
            None => {
                let result = fleet.run_script(&self.script, &opts)?;
                if self.fleet.json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    print_result(&result);
                }
                Ok(())
            }
        }
    }
}
