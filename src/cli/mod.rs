//! Command-line subcommands.

pub mod credentials;
pub mod hosts;
pub mod on;
pub mod retry;
pub mod script;
pub mod tmpdir;
pub mod transfer;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::path::PathBuf;

use fleetrun::config::Config;
use fleetrun::{ExecutionResult, Fleet, OneOrMany};

/// Arguments shared by every subcommand that talks to hosts.
#[derive(Args, Debug, Clone)]
pub struct FleetArgs {
    /// Host inventory (defaults to the platform config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

impl FleetArgs {
    pub fn load_config(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)
                .with_context(|| format!("Failed to load inventory {}", path.display()))?,
            None => Config::load()?,
        };
        Ok(config)
    }

    /// Loads the inventory and builds a fleet from it.
    pub fn fleet(&self) -> Result<Fleet> {
        let config = self.load_config()?;
        fleet_from(&config)
    }
}

/// Builds a fleet, refusing an empty inventory.
pub fn fleet_from(config: &Config) -> Result<Fleet> {
    if config.is_empty() {
        return Err(anyhow!(
            "No hosts configured. Pass --config or create {}",
            Config::default_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "a hosts.yml inventory".to_string())
        ));
    }
    Ok(Fleet::from_config(config))
}

/// Parses repeated `KEY=VALUE` arguments.
pub fn parse_env_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

pub fn print_results(results: &OneOrMany<ExecutionResult>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    for result in results.iter() {
        print_result(result);
    }
    Ok(())
}

pub fn print_result(result: &ExecutionResult) {
    println!(
        "[{}] {} (exit {})",
        result.host,
        result.command.cmd_line(),
        result.exit_code
    );
    let output = result.output();
    if !output.is_empty() {
        println!("{}", output.trim_end());
    }
}
