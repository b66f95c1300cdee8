//! Config command - initialize, validate and inspect configuration

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use skydir_core::config::Config;

use crate::context;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a sample configuration file
    Init(InitArgs),
    /// Check the configuration for problems
    Validate,
    /// Print the active configuration (token redacted)
    Show,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

impl ConfigCommand {
    pub async fn execute(&self, format: OutputFormat, config_override: Option<&Path>) -> Result<()> {
        let formatter = get_formatter(format);
        let path = context::resolve_config_path(config_override);

        match self {
            ConfigCommand::Init(args) => {
                if path.exists() && !args.force {
                    bail!(
                        "Configuration file {} already exists (use --force to overwrite)",
                        path.display()
                    );
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create config directory {}", parent.display())
                    })?;
                }
                std::fs::write(&path, Config::sample())
                    .with_context(|| format!("Failed to write {}", path.display()))?;

                formatter.success(&format!("Configuration file created: {}", path.display()));
                formatter.info("Set your OAuth token and adjust the directory pairs.");
                Ok(())
            }
            ConfigCommand::Validate => {
                let config = Config::load(&path).with_context(|| {
                    format!("Failed to load configuration from {}", path.display())
                })?;
                config.validate().context("Invalid configuration")?;
                formatter.success(&format!(
                    "{} is valid ({} pairs)",
                    path.display(),
                    config.pairs.len()
                ));
                Ok(())
            }
            ConfigCommand::Show => {
                let mut config = Config::load(&path).with_context(|| {
                    format!("Failed to load configuration from {}", path.display())
                })?;
                config.token = "<redacted>".to_string();

                let rendered = serde_yaml::to_string(&config)?;
                formatter.print_json(&serde_json::to_value(&config)?);
                if matches!(format, OutputFormat::Human) {
                    print!("{rendered}");
                }
                Ok(())
            }
        }
    }
}
