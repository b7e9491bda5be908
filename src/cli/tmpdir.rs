//! `fleetrun tmpdir`: create (or remove) scoped temp directories.

use anyhow::Result;
use clap::Args;
use serde_json::json;

use fleetrun::{Host, HostHelpers, ResourceHandle};

use super::FleetArgs;

#[derive(Args)]
#[command(about = "Create a temporary directory on hosts, optionally owned by a user and group")]
pub struct TmpdirCommand {
    /// Host name, comma-separated host names, or role tag
    pub target: String,

    /// Directory name prefix
    #[arg(long, default_value = "fleetrun")]
    pub prefix: String,

    /// Owner to chown the directory to
    #[arg(short, long)]
    pub user: Option<String>,

    /// Group to chgrp the directory to
    #[arg(short, long)]
    pub group: Option<String>,

    /// Remove the directories again once created
    #[arg(long)]
    pub cleanup: bool,

    #[command(flatten)]
    pub fleet: FleetArgs,
}

impl TmpdirCommand {
    pub fn execute(&self) -> Result<()> {
        let fleet = self.fleet.fleet()?;
        let spec = fleet.target(&self.target)?;

        let handles = fleet.create_tmpdir_on(
            spec,
            &self.prefix,
            self.user.as_deref(),
            self.group.as_deref(),
        )?;

        if self.fleet.json {
            let entries: Vec<_> = handles.iter().map(describe).collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        } else {
            for handle in handles.iter() {
                println!("[{}] {}", handle.host.name(), handle.remote_path);
            }
        }

        if self.cleanup {
            for handle in handles.iter() {
                fleet.remove_tmpdir_on(handle)?;
            }
        }
        Ok(())
    }
}

fn describe(handle: &ResourceHandle) -> serde_json::Value {
    json!({
        "host": handle.host.name(),
        "remote_path": handle.remote_path,
        "owner": handle.owner,
        "group": handle.group,
    })
}
