//! `fleetrun credentials`: inspect a credentials file section.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use fleetrun::config::credentials::{parse_credentials_file, CREDENTIAL_ENV};

#[derive(Args)]
#[command(about = "Print the keys of one section of a credentials file")]
pub struct CredentialsCommand {
    /// Credentials YAML file
    pub file: PathBuf,

    /// Section to read (overridden by the FLEETRUN_CREDENTIAL environment variable)
    #[arg(short, long)]
    pub credential: Option<String>,

    /// Print values as well as keys
    #[arg(long)]
    pub show_values: bool,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl CredentialsCommand {
    pub fn execute(&self) -> Result<()> {
        let section = parse_credentials_file(&self.file, self.credential.as_deref())?;

        if std::env::var(CREDENTIAL_ENV).is_ok_and(|s| !s.is_empty()) {
            log::info!("Section chosen by {}", CREDENTIAL_ENV);
        }

        if self.json {
            if self.show_values {
                println!("{}", serde_json::to_string_pretty(&section)?);
            } else {
                let keys: Vec<_> = section.keys().collect();
                println!("{}", serde_json::to_string_pretty(&keys)?);
            }
            return Ok(());
        }

        for (key, value) in &section {
            if self.show_values {
                println!("{}: {}", key, value);
            } else {
                println!("{}", key);
            }
        }
        Ok(())
    }
}
