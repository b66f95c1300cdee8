//! Filesystem watching
//!
//! Wraps the `notify` crate to monitor the configured pair roots. The
//! coordinator only needs to know that *something* changed under a root, so
//! events are reduced to their paths here; classification into created/
//! modified/deleted is irrelevant once a full reconciliation pass runs
//! anyway. Debouncing happens downstream in
//! [`DebouncedTriggerQueue`](crate::debounce::DebouncedTriggerQueue).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Watches pair roots and forwards changed paths through a channel
///
/// On Linux this typically uses inotify. Raw OS events are filtered (access
/// events are dropped) and every affected path is forwarded, including both
/// sides of a rename.
pub struct FileWatcher {
    watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Creates a watcher that sends changed paths to `tx`
    ///
    /// # Errors
    /// Returns an error if the underlying OS watcher cannot be created
    pub fn new(tx: mpsc::Sender<PathBuf>) -> Result<Self> {
        info!("Initializing file watcher");

        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for path in relevant_paths(&event) {
                        if let Err(e) = tx.blocking_send(path) {
                            warn!(error = %e, "Failed to send change event (receiver dropped)");
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "File watcher error");
                }
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        Ok(Self { watcher })
    }

    /// Starts watching a directory recursively
    ///
    /// # Errors
    /// Returns an error if the path cannot be watched (does not exist,
    /// insufficient permissions, or inotify watch limit reached)
    pub fn watch(&mut self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "Starting recursive watch");
        self.watcher
            .watch(path, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch path: {}", path.display()))
    }

    /// Stops watching a directory
    ///
    /// # Errors
    /// Returns an error if the path was not being watched
    pub fn unwatch(&mut self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "Stopping watch");
        self.watcher
            .unwatch(path)
            .with_context(|| format!("Failed to unwatch path: {}", path.display()))
    }
}

/// Extracts the paths worth reacting to from a raw notify event
///
/// Create, modify, and remove events contribute all their paths (a rename
/// carries both the old and the new path, and both pair roots may need a
/// pass). Access events and path-less events yield nothing.
fn relevant_paths(event: &notify::Event) -> Vec<PathBuf> {
    match &event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
            debug!(kind = ?event.kind, paths = event.paths.len(), "Filesystem change");
            event.paths.clone()
        }
        _ => Vec::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================
