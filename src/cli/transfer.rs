//! `fleetrun copy-to`, `copy-from` and `create-file`.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use fleetrun::{HostHelpers, Protocol, TransferOptions};

use super::{print_results, FleetArgs};

#[derive(Args)]
#[command(about = "Upload a local file or directory to hosts")]
pub struct CopyToCommand {
    /// Host name, comma-separated host names, or role tag
    pub target: String,

    /// Local source path
    pub local: PathBuf,

    /// Remote destination path
    pub remote: String,

    /// Transfer protocol (scp, rsync)
    #[arg(long, default_value = "scp")]
    pub protocol: Protocol,

    /// Upload to all hosts concurrently
    #[arg(short, long)]
    pub parallel: bool,

    #[command(flatten)]
    pub fleet: FleetArgs,
}

impl CopyToCommand {
    pub fn execute(&self) -> Result<()> {
        let fleet = self.fleet.fleet()?;
        let spec = fleet.target(&self.target)?;
        let opts = TransferOptions {
            protocol: self.protocol,
            parallel: self.parallel,
        };

        let results = fleet.copy_to(spec, &self.local, &self.remote, &opts)?;
        print_results(&results, self.fleet.json)
    }
}

#[derive(Args)]
#[command(about = "Download a remote file or directory from hosts")]
pub struct CopyFromCommand {
    /// Host name, comma-separated host names, or role tag
    pub target: String,

    /// Remote source path
    pub remote: String,

    /// Local destination path
    pub local: PathBuf,

    /// Transfer protocol (scp, rsync)
    #[arg(long, default_value = "scp")]
    pub protocol: Protocol,

    #[command(flatten)]
    pub fleet: FleetArgs,
}

impl CopyFromCommand {
    pub fn execute(&self) -> Result<()> {
        let fleet = self.fleet.fleet()?;
        let spec = fleet.target(&self.target)?;

        let results = fleet.copy_from(
            spec,
            &self.remote,
            &self.local,
            &TransferOptions::with_protocol(self.protocol),
        )?;
        print_results(&results, self.fleet.json)
    }
}

#[derive(Args)]
#[command(about = "Write a file with the given contents on hosts")]
pub struct CreateFileCommand {
    /// Host name, comma-separated host names, or role tag
    pub target: String,

    /// Remote file path
    pub remote: String,

    /// File contents (read from --from or stdin when omitted)
    #[arg(long, conflicts_with = "from")]
    pub contents: Option<String>,

    /// Local file to take the contents from
    #[arg(long)]
    pub from: Option<PathBuf>,

    /// Transfer protocol (scp, rsync)
    #[arg(long, default_value = "scp")]
    pub protocol: Protocol,

    #[command(flatten)]
    pub fleet: FleetArgs,
}

impl CreateFileCommand {
    pub fn execute(&self) -> Result<()> {
        let contents = match (&self.contents, &self.from) {
            (Some(contents), _) => contents.clone(),
            (None, Some(path)) => fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
            (None, None) => {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };

        let fleet = self.fleet.fleet()?;
        let spec = fleet.target(&self.target)?;

        let results = fleet.create_remote_file(
            spec,
            &self.remote,
            &contents,
            &TransferOptions::with_protocol(self.protocol),
        )?;
        print_results(&results, self.fleet.json)
    }
}
