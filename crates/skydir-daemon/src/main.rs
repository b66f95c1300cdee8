//! SkyDir Daemon - background synchronization service
//!
//! Runs as a foreground process (systemd user service style) and handles:
//! - periodic reconciliation of every configured directory pair
//! - debounced filesystem-watch triggers
//! - graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon wires the adapters (disk API, SQLite record store) into the
//! engine's [`Coordinator`], starts the timer and watch trigger sources,
//! and then lets the coordinator serialize passes per pair. Shutdown is a
//! `CancellationToken`: trigger intake stops, the in-flight action
//! finishes, remaining actions are skipped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use skydir_core::config::Config;
use skydir_core::ports::{Fingerprinter, RecordStore, RemoteStore};
use skydir_disk::{DiskClient, DiskRemoteStore};
use skydir_engine::coordinator::{spawn_timer_triggers, spawn_watch_triggers, Coordinator};
use skydir_engine::debounce::PathRouter;
use skydir_engine::executor::RetryPolicy;
use skydir_engine::fingerprint::{CachedFingerprinter, Sha256Fingerprinter};
use skydir_engine::watcher::FileWatcher;
use skydir_store::{DatabasePool, SqliteRecordStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Trigger channel depth; bursts beyond this apply backpressure upstream
const TRIGGER_CHANNEL_CAPACITY: usize = 256;

/// Main daemon service wiring configuration, adapters and the coordinator
struct DaemonService {
    config: Config,
    coordinator: Arc<Coordinator>,
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Loads configuration and builds the full component graph
    async fn new(shutdown: CancellationToken) -> Result<Self> {
        let config_path = config_path();
        let config =
            Config::load(&config_path).with_context(|| {
                format!("Failed to load configuration from {}", config_path.display())
            })?;
        config.validate().context("Invalid configuration")?;
        info!(config_path = %config_path.display(), pairs = config.pairs.len(),
            "Loaded configuration");

        let db_path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skydir")
            .join("records.db");
        let pool = DatabasePool::new(&db_path)
            .await
            .context("Failed to open record database")?;
        let records: Arc<dyn RecordStore> =
            Arc::new(SqliteRecordStore::new(pool.pool().clone()));

        let client = DiskClient::with_base_url(
            &config.token,
            &config.api.base_url,
            Duration::from_secs(config.api.timeout_secs),
        )
        .context("Failed to build API client")?;
        let remote: Arc<dyn RemoteStore> = Arc::new(DiskRemoteStore::new(client));

        let fingerprinter: Arc<dyn Fingerprinter> = Arc::new(CachedFingerprinter::new(
            Arc::new(Sha256Fingerprinter::new()),
        ));

        let coordinator = Arc::new(Coordinator::new(
            config.pair_configs().context("Invalid pair configuration")?,
            remote,
            records,
            fingerprinter,
            RetryPolicy::default(),
            shutdown.clone(),
        ));

        Ok(Self {
            config,
            coordinator,
            shutdown,
        })
    }

    /// Starts trigger sources and runs the coordinator until shutdown
    async fn run(&self) -> Result<()> {
        let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_CHANNEL_CAPACITY);

        let timer_task = spawn_timer_triggers(
            self.coordinator.pair_ids(),
            Duration::from_secs(self.config.daemon.sync_interval),
            trigger_tx.clone(),
            self.shutdown.clone(),
        );
        info!(
            interval_secs = self.config.daemon.sync_interval,
            "Periodic sync trigger started"
        );

        // The watcher must outlive the coordinator loop; dropping it stops
        // event delivery.
        let mut watcher = None;
        let mut watch_task = None;
        if self.config.daemon.watch {
            let (raw_tx, raw_rx) = mpsc::channel(TRIGGER_CHANNEL_CAPACITY);
            let mut file_watcher =
                FileWatcher::new(raw_tx).context("Failed to initialize file watcher")?;

            for (pair, root) in self.coordinator.pair_roots() {
                if root.is_dir() {
                    match file_watcher.watch(&root) {
                        Ok(()) => info!(pair = %pair, root = %root.display(), "Watching"),
                        Err(err) => {
                            warn!(pair = %pair, root = %root.display(), error = %format!("{err:#}"),
                                "Cannot watch pair root")
                        }
                    }
                } else {
                    warn!(pair = %pair, root = %root.display(),
                        "Pair root does not exist, skipping watch");
                }
            }

            watch_task = Some(spawn_watch_triggers(
                raw_rx,
                PathRouter::new(self.coordinator.pair_roots()),
                Duration::from_secs(self.config.daemon.debounce_delay),
                trigger_tx.clone(),
                self.shutdown.clone(),
            ));
            watcher = Some(file_watcher);
            info!(
                debounce_secs = self.config.daemon.debounce_delay,
                "Filesystem watch trigger started"
            );
        }
        drop(trigger_tx);

        Arc::clone(&self.coordinator).run(trigger_rx).await;

        // Coordinator has stopped accepting triggers; wind the sources down.
        timer_task.await.ok();
        if let Some(task) = watch_task {
            task.await.ok();
        }
        drop(watcher);

        for status in self.coordinator.status() {
            info!(
                pair = %status.pair,
                state = %status.state,
                last_success = ?status.last_success,
                last_error = ?status.last_error,
                "Final pair status"
            );
        }

        Ok(())
    }
}

/// Configuration file path: `$SKYDIR_CONFIG` or the platform default
fn config_path() -> PathBuf {
    std::env::var_os("SKYDIR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path)
}

/// Waits for SIGTERM or SIGINT and cancels the shutdown token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins; the configured level is the default below it.
    let default_level = Config::load(&config_path())
        .map(|c| c.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!("SkyDir daemon starting (skydird)");

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(shutdown_token.clone()).await?;
    let result = service.run().await;

    match &result {
        Ok(()) => info!("SkyDir daemon shut down gracefully"),
        Err(e) => error!(error = %format!("{e:#}"), "SkyDir daemon exiting with error"),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_propagates_to_children() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        parent.cancel();
        assert!(parent.is_cancelled());
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_config_path_env_override() {
        // Not set in the test environment: falls back to the default.
        if std::env::var_os("SKYDIR_CONFIG").is_none() {
            assert_eq!(config_path(), Config::default_path());
        }
    }
}
