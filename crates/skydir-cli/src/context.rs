//! Shared command context: configuration loading and adapter wiring

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use skydir_core::config::Config;
use skydir_core::ports::{Fingerprinter, RecordStore, RemoteStore};
use skydir_disk::{DiskClient, DiskRemoteStore};
use skydir_engine::coordinator::Coordinator;
use skydir_engine::executor::RetryPolicy;
use skydir_engine::fingerprint::{CachedFingerprinter, Sha256Fingerprinter};
use skydir_store::{DatabasePool, SqliteRecordStore};
use tokio_util::sync::CancellationToken;

/// Resolves the configuration file path (`--config` flag wins)
pub fn resolve_config_path(config_override: Option<&Path>) -> PathBuf {
    config_override
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path)
}

/// Loads and validates the configuration
pub fn load_config(config_override: Option<&Path>) -> Result<Config> {
    let path = resolve_config_path(config_override);
    let config = Config::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Default location of the record database
pub fn db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skydir")
        .join("records.db")
}

/// Opens the record store at the default location
pub async fn open_record_store() -> Result<Arc<SqliteRecordStore>> {
    let pool = DatabasePool::new(&db_path())
        .await
        .context("Failed to open record database")?;
    Ok(Arc::new(SqliteRecordStore::new(pool.pool().clone())))
}

/// Builds the API client from configuration
pub fn build_client(config: &Config) -> Result<DiskClient> {
    DiskClient::with_base_url(
        &config.token,
        &config.api.base_url,
        Duration::from_secs(config.api.timeout_secs),
    )
    .context("Failed to build API client")
}

/// Wires up the full engine stack for one-shot commands
pub async fn build_coordinator(config: &Config) -> Result<Arc<Coordinator>> {
    let records: Arc<dyn RecordStore> = open_record_store().await?;
    let remote: Arc<dyn RemoteStore> = Arc::new(DiskRemoteStore::new(build_client(config)?));
    let fingerprinter: Arc<dyn Fingerprinter> =
        Arc::new(CachedFingerprinter::new(Arc::new(Sha256Fingerprinter::new())));

    Ok(Arc::new(Coordinator::new(
        config.pair_configs().context("Invalid pair configuration")?,
        remote,
        records,
        fingerprinter,
        RetryPolicy::default(),
        CancellationToken::new(),
    )))
}
