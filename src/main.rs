use anyhow::Result;
use clap::{Parser, Subcommand};

mod cli;

use cli::credentials::CredentialsCommand;
use cli::hosts::HostsCommand;
use cli::on::OnCommand;
use cli::retry::RetryCommand;
use cli::script::ScriptCommand;
use cli::tmpdir::TmpdirCommand;
use cli::transfer::{CopyFromCommand, CopyToCommand, CreateFileCommand};

#[derive(Parser)]
#[command(name = "fleetrun")]
#[command(about = "Run commands, transfers and scripts across a fleet of test hosts", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    On(OnCommand),
    Retry(RetryCommand),
    Tmpdir(TmpdirCommand),
    CopyTo(CopyToCommand),
    CopyFrom(CopyFromCommand),
    CreateFile(CreateFileCommand),
    RunScript(ScriptCommand),
    Hosts(HostsCommand),
    Credentials(CredentialsCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // INFO by default, DEBUG with --verbose; RUST_LOG still wins
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::On(cmd) => cmd.execute(),
        Commands::Retry(cmd) => cmd.execute(),
        Commands::Tmpdir(cmd) => cmd.execute(),
        Commands::CopyTo(cmd) => cmd.execute(),
        Commands::CopyFrom(cmd) => cmd.execute(),
        Commands::CreateFile(cmd) => cmd.execute(),
        Commands::RunScript(cmd) => cmd.execute(),
        Commands::Hosts(cmd) => cmd.execute(),
        Commands::Credentials(cmd) => cmd.execute(),
    }
}
