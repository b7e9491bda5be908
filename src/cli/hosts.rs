//! `fleetrun hosts`: show the inventory.

use anyhow::Result;
use clap::Args;

use fleetrun::config::HostConfig;

use super::FleetArgs;

#[derive(Args)]
#[command(about = "List hosts in the inventory")]
pub struct HostsCommand {
    /// Only show hosts tagged with this role
    #[arg(short, long)]
    pub role: Option<String>,

    #[command(flatten)]
    pub fleet: FleetArgs,
}

impl HostsCommand {
    pub fn execute(&self) -> Result<()> {
        let config = self.fleet.load_config()?;

        let hosts: Vec<&HostConfig> = config
            .hosts
            .iter()
            .filter(|h| match &self.role {
                Some(role) => {
                    let role = role.trim_start_matches(':');
                    h.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
                }
                None => true,
            })
            .collect();

        if self.fleet.json {
            println!("{}", serde_json::to_string_pretty(&hosts)?);
            return Ok(());
        }

        if hosts.is_empty() {
            println!("No hosts configured.");
            return Ok(());
        }

        println!("{:<20} {:<35} {}", "NAME", "ADDRESS", "ROLES");
        println!("{}", "-".repeat(70));
        for host in hosts {
            println!(
                "{:<20} {:<35} {}",
                host.name,
                host.connection_string(),
                host.roles.join(", ")
            );
        }
        Ok(())
    }
}
