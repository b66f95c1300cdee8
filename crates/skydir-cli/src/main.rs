//! SkyDir CLI - command-line interface
//!
//! Provides commands for:
//! - One-shot synchronization of configured pairs
//! - Viewing per-pair sync status
//! - Managing the configuration file
//! - Testing connectivity and configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{
    config::ConfigCommand, status::StatusCommand, sync::SyncCommand, test::TestCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "skydir", version, about = "Directory-pair synchronization for cloud disk storage")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a one-shot reconciliation of configured pairs
    Sync(SyncCommand),
    /// Show per-pair synchronization status
    Status(StatusCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Test connectivity and configuration
    Test(TestCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(format, cli.config.as_deref()).await,
        Commands::Status(cmd) => cmd.execute(format, cli.config.as_deref()).await,
        Commands::Config(cmd) => cmd.execute(format, cli.config.as_deref()).await,
        Commands::Test(cmd) => cmd.execute(format, cli.config.as_deref()).await,
    }
}
