//! Status command - per-pair synchronization state
//!
//! Reads the record store directly (there is no daemon IPC surface), so
//! the figures reflect the last completed pass regardless of who ran it.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use skydir_core::domain::newtypes::PairId;
use skydir_core::ports::record_store::RecordStore;

use crate::context;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat, config_override: Option<&Path>) -> Result<()> {
        let formatter = get_formatter(format);

        let config = context::load_config(config_override)?;
        let records = context::open_record_store().await?;

        let mut rows = Vec::new();
        for pair in &config.pairs {
            let id = PairId::new(&pair.name)?;
            let last_synced = records.last_synced(&id).await?;
            let tracked = records.load(&id).await?.len();

            rows.push(serde_json::json!({
                "pair": pair.name,
                "mode": pair.mode.to_string(),
                "tracked_paths": tracked,
                "last_synced": last_synced.map(|t| t.to_rfc3339()),
            }));

            let when = last_synced
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            formatter.success(&format!(
                "{} [{}] {} tracked, last synced {}",
                pair.name, pair.mode, tracked, when
            ));
        }

        formatter.print_json(&serde_json::Value::Array(rows));
        Ok(())
    }
}
