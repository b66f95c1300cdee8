//! Sync command - one-shot reconciliation
//!
//! `skydir sync` reconciles every configured pair (or a single pair with
//! `--pair`) through the same engine the daemon runs, and exits non-zero
//! when any action failed.

use std::path::Path;

use anyhow::{bail, Result};
use clap::Args;
use skydir_core::domain::newtypes::PairId;

use crate::context;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Reconcile only this pair (default: all configured pairs)
    #[arg(long)]
    pub pair: Option<String>,
}

impl SyncCommand {
    pub async fn execute(&self, format: OutputFormat, config_override: Option<&Path>) -> Result<()> {
        let formatter = get_formatter(format);

        let config = context::load_config(config_override)?;
        let coordinator = context::build_coordinator(&config).await?;

        let targets: Vec<PairId> = match &self.pair {
            Some(name) => vec![PairId::new(name.clone())?],
            None => coordinator.pair_ids(),
        };

        let mut failed_actions = 0usize;
        let mut failed_pairs = 0usize;

        for pair in &targets {
            match coordinator.run_once(pair).await {
                Ok(report) => {
                    formatter.print_json(&serde_json::to_value(&report)?);
                    if report.is_clean() {
                        formatter.success(&format!("{pair}: {}", report.summary()));
                    } else {
                        formatter.warn(&format!("{pair}: {}", report.summary()));
                        for failure in &report.failures {
                            formatter.info(&format!(
                                "{} {} failed: {}",
                                failure.action, failure.path, failure.error
                            ));
                        }
                        failed_actions += report.failures.len();
                    }
                }
                Err(err) => {
                    formatter.error(&format!("{pair}: {err:#}"));
                    failed_pairs += 1;
                }
            }
        }

        if failed_actions > 0 || failed_pairs > 0 {
            bail!("{failed_actions} actions and {failed_pairs} pairs failed");
        }
        Ok(())
    }
}
