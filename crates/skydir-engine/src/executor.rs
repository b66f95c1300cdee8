//! Reconciliation executor
//!
//! Applies the action list produced by the diff engine against the remote
//! store and the local filesystem. Each action is independent: a failure is
//! collected into the [`PassReport`] and execution continues with the next
//! action.
//!
//! ## Crash safety
//!
//! The record entry for a path is written only *after* its transfer or
//! delete is confirmed, never before. The record therefore never claims a
//! synchronization that did not happen: a crash mid-transfer is recovered
//! by the next pass simply re-detecting the path as changed. Downloads go
//! through a temp file in the target directory and are renamed into place.
//!
//! ## Retries
//!
//! Transient remote errors are retried with exponential backoff (1s, 2s,
//! 4s, 8s by default) up to a bounded attempt count, then downgraded to a
//! per-path failure. Permanent errors fail the action immediately. Retries
//! are abandoned, not extended, once shutdown is requested.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use skydir_core::domain::action::{DiffOutcome, SyncAction};
use skydir_core::domain::entry::{EntryKind, Side, Snapshot};
use skydir_core::domain::newtypes::{PairId, RelPath};
use skydir_core::domain::pair::PairConfig;
use skydir_core::domain::record::RecordEntry;
use skydir_core::ports::record_store::RecordStore;
use skydir_core::ports::remote_store::{RemoteError, RemoteStore};
use skydir_core::ports::Fingerprinter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Retry behavior for transient remote failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per remote operation (first try included)
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// One action that could not be applied
#[derive(Debug, Clone, Serialize)]
pub struct ActionFailure {
    /// Path the action targeted
    pub path: RelPath,
    /// Action verb (`upload`, `download`, ...)
    pub action: String,
    /// Rendered error
    pub error: String,
}

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    /// Unique id of this pass
    pub pass_id: Uuid,
    /// The pair this pass reconciled
    pub pair: PairId,
    /// Files uploaded (conflict resolutions included)
    pub uploaded: u32,
    /// Files downloaded (conflict resolutions included)
    pub downloaded: u32,
    /// Local files/directories deleted
    pub deleted_local: u32,
    /// Remote files/directories deleted
    pub deleted_remote: u32,
    /// Directories created on either side
    pub dirs_created: u32,
    /// Conflicts resolved by the deterministic rule
    pub conflicts_resolved: u32,
    /// Actions not attempted because shutdown was requested
    pub skipped: u32,
    /// Per-action failures (pass continues past them)
    pub failures: Vec<ActionFailure>,
    /// Wall-clock duration of the pass in milliseconds
    pub duration_ms: u64,
}

impl PassReport {
    fn new(pair: PairId) -> Self {
        Self {
            pass_id: Uuid::new_v4(),
            pair,
            uploaded: 0,
            downloaded: 0,
            deleted_local: 0,
            deleted_remote: 0,
            dirs_created: 0,
            conflicts_resolved: 0,
            skipped: 0,
            failures: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Whether every attempted action succeeded
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total number of applied actions
    #[must_use]
    pub fn total_applied(&self) -> u32 {
        self.uploaded + self.downloaded + self.deleted_local + self.deleted_remote
            + self.dirs_created
    }

    /// One-line human summary for logs and the CLI
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} up, {} down, {} deleted, {} conflicts, {} failed ({} ms)",
            self.uploaded,
            self.downloaded,
            self.deleted_local + self.deleted_remote,
            self.conflicts_resolved,
            self.failures.len(),
            self.duration_ms
        )
    }
}

/// Applies diff outcomes to the world
pub struct Executor {
    remote: Arc<dyn RemoteStore>,
    records: Arc<dyn RecordStore>,
    fingerprinter: Arc<dyn Fingerprinter>,
    retry: RetryPolicy,
}

impl Executor {
    /// Create an executor with the default retry policy
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        records: Arc<dyn RecordStore>,
        fingerprinter: Arc<dyn Fingerprinter>,
    ) -> Self {
        Self {
            remote,
            records,
            fingerprinter,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy (shorter delays in tests)
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Applies all actions of one pass and retires forgotten record entries
    ///
    /// Never fails as a whole: per-action errors are collected in the
    /// report. Cancellation is honored between actions; an in-flight
    /// transfer always runs to completion.
    #[tracing::instrument(skip_all, fields(pair = %pair.id))]
    pub async fn execute(
        &self,
        pair: &PairConfig,
        outcome: DiffOutcome,
        remote_snapshot: &Snapshot,
        cancel: &CancellationToken,
    ) -> PassReport {
        let started = std::time::Instant::now();
        let mut report = PassReport::new(pair.id.clone());

        // First sync into an absent remote root: materialize the root chain
        // before any upload tries to write below it.
        if remote_snapshot.is_empty() && writes_remote(&outcome.actions) {
            if let Err(err) = self.ensure_remote_root(&pair.remote_root, cancel).await {
                warn!(root = %pair.remote_root, error = %err,
                    "Could not create remote root, uploads will fail this pass");
            }
        }

        let total = outcome.actions.len();
        for (index, action) in outcome.actions.into_iter().enumerate() {
            if cancel.is_cancelled() {
                report.skipped = (total - index) as u32;
                info!(skipped = report.skipped, "Shutdown requested, skipping remaining actions");
                break;
            }

            debug!(action = %action, "Applying action");
            let result = match &action {
                SyncAction::Upload(path) => self.upload(pair, path, cancel).await,
                SyncAction::Download(path) => {
                    self.download(pair, path, remote_snapshot, cancel).await
                }
                SyncAction::DeleteLocal(path) => self.delete_local(pair, path).await,
                SyncAction::DeleteRemote(path) => self.delete_remote(pair, path, cancel).await,
                SyncAction::CreateLocalDir(path) => self.create_local_dir(pair, path).await,
                SyncAction::CreateRemoteDir(path) => {
                    self.create_remote_dir(pair, path, cancel).await
                }
                SyncAction::Conflict { path, winner, .. } => match winner {
                    Side::Local => self.upload(pair, path, cancel).await,
                    Side::Remote => self.download(pair, path, remote_snapshot, cancel).await,
                },
            };

            match result {
                Ok(()) => match &action {
                    SyncAction::Upload(_) => report.uploaded += 1,
                    SyncAction::Download(_) => report.downloaded += 1,
                    SyncAction::DeleteLocal(_) => report.deleted_local += 1,
                    SyncAction::DeleteRemote(_) => report.deleted_remote += 1,
                    SyncAction::CreateLocalDir(_) | SyncAction::CreateRemoteDir(_) => {
                        report.dirs_created += 1;
                    }
                    SyncAction::Conflict { path, winner, .. } => {
                        report.conflicts_resolved += 1;
                        match winner {
                            Side::Local => report.uploaded += 1,
                            Side::Remote => report.downloaded += 1,
                        }
                        info!(path = %path, winner = %winner, "Conflict resolved");
                    }
                },
                Err(err) => {
                    warn!(action = %action, error = %format!("{err:#}"), "Action failed");
                    report.failures.push(ActionFailure {
                        path: action.path().clone(),
                        action: action.verb().to_string(),
                        error: format!("{err:#}"),
                    });
                }
            }
        }

        // Retire record entries for paths gone from both sides.
        for path in &outcome.forget {
            debug!(path = %path, "Retiring record entry (deleted on both sides)");
            if let Err(err) = self.records.remove(&pair.id, path).await {
                warn!(path = %path, error = %err, "Failed to retire record entry");
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            pass = %report.pass_id,
            uploaded = report.uploaded,
            downloaded = report.downloaded,
            deleted = report.deleted_local + report.deleted_remote,
            conflicts = report.conflicts_resolved,
            failures = report.failures.len(),
            duration_ms = report.duration_ms,
            "Pass complete"
        );
        report
    }

    // ------------------------------------------------------------------
    // Individual actions
    // ------------------------------------------------------------------

    async fn upload(
        &self,
        pair: &PairConfig,
        path: &RelPath,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let local_path = path.to_local(&pair.local_root);
        let remote_path = path.to_remote(&pair.remote_root);

        self.with_retry("upload", cancel, || {
            self.remote.upload(&local_path, &remote_path)
        })
        .await
        .with_context(|| format!("Upload of {path} failed"))?;

        // Transfer confirmed; only now may the record claim it.
        let metadata = tokio::fs::metadata(&local_path)
            .await
            .with_context(|| format!("Cannot stat {} after upload", local_path.display()))?;
        let fingerprint = match self.fingerprinter.compute(&local_path).await {
            Ok(fp) => Some(fp),
            Err(err) => {
                warn!(path = %path, error = %err, "No fingerprint for uploaded file");
                None
            }
        };

        let entry = RecordEntry {
            kind: EntryKind::File,
            size: metadata.len(),
            modified: metadata
                .modified()
                .map(Into::into)
                .unwrap_or_else(|_| Utc::now()),
            fingerprint,
            synced_at: Utc::now(),
        };
        self.records.upsert(&pair.id, path, &entry).await?;
        Ok(())
    }

    async fn download(
        &self,
        pair: &PairConfig,
        path: &RelPath,
        remote_snapshot: &Snapshot,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let local_path = path.to_local(&pair.local_root);
        let remote_path = path.to_remote(&pair.remote_root);

        let tmp_path = local_path.with_file_name(format!(".{}.skydir-tmp", path.file_name()));

        let transfer = self
            .with_retry("download", cancel, || {
                self.remote.download(&remote_path, &tmp_path)
            })
            .await;
        if let Err(err) = transfer {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(anyhow::Error::new(err).context(format!("Download of {path} failed")));
        }

        tokio::fs::rename(&tmp_path, &local_path)
            .await
            .with_context(|| format!("Cannot move download into place at {}", local_path.display()))?;

        let metadata = tokio::fs::metadata(&local_path)
            .await
            .with_context(|| format!("Cannot stat {} after download", local_path.display()))?;

        // Prefer the hash the listing already gave us; hashing the fresh
        // local copy is the fallback.
        let fingerprint = match remote_snapshot.get(path).and_then(|e| e.fingerprint.clone()) {
            Some(fp) => Some(fp),
            None => self.fingerprinter.compute(&local_path).await.ok(),
        };

        let entry = RecordEntry {
            kind: EntryKind::File,
            size: metadata.len(),
            modified: metadata
                .modified()
                .map(Into::into)
                .unwrap_or_else(|_| Utc::now()),
            fingerprint,
            synced_at: Utc::now(),
        };
        self.records.upsert(&pair.id, path, &entry).await?;
        Ok(())
    }

    async fn delete_local(&self, pair: &PairConfig, path: &RelPath) -> anyhow::Result<()> {
        let local_path = path.to_local(&pair.local_root);

        match tokio::fs::symlink_metadata(&local_path).await {
            Ok(metadata) if metadata.is_dir() => {
                // Children were deleted earlier in the ordering; a non-empty
                // directory here is a real error worth surfacing.
                tokio::fs::remove_dir(&local_path)
                    .await
                    .with_context(|| format!("Cannot remove directory {}", local_path.display()))?;
            }
            Ok(_) => {
                tokio::fs::remove_file(&local_path)
                    .await
                    .with_context(|| format!("Cannot remove file {}", local_path.display()))?;
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path, "Already gone locally");
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("Cannot stat {} for deletion", local_path.display())));
            }
        }

        self.records.remove(&pair.id, path).await?;
        Ok(())
    }

    async fn delete_remote(
        &self,
        pair: &PairConfig,
        path: &RelPath,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let remote_path = path.to_remote(&pair.remote_root);

        self.with_retry("delete", cancel, || self.remote.delete(&remote_path))
            .await
            .with_context(|| format!("Remote delete of {path} failed"))?;

        self.records.remove(&pair.id, path).await?;
        Ok(())
    }

    async fn create_local_dir(&self, pair: &PairConfig, path: &RelPath) -> anyhow::Result<()> {
        let local_path = path.to_local(&pair.local_root);
        tokio::fs::create_dir_all(&local_path)
            .await
            .with_context(|| format!("Cannot create directory {}", local_path.display()))?;

        let entry = dir_record_entry();
        self.records.upsert(&pair.id, path, &entry).await?;
        Ok(())
    }

    async fn create_remote_dir(
        &self,
        pair: &PairConfig,
        path: &RelPath,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let remote_path = path.to_remote(&pair.remote_root);

        self.with_retry("mkdir", cancel, || self.remote.mkdir(&remote_path))
            .await
            .with_context(|| format!("Remote mkdir of {path} failed"))?;

        let entry = dir_record_entry();
        self.records.upsert(&pair.id, path, &entry).await?;
        Ok(())
    }

    /// Creates the pair's remote root chain segment by segment
    ///
    /// `mkdir` is idempotent at the adapter level, so existing segments are
    /// harmless.
    async fn ensure_remote_root(
        &self,
        root: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RemoteError> {
        let mut prefix = String::new();
        for segment in root.split('/').filter(|s| !s.is_empty()) {
            prefix.push('/');
            prefix.push_str(segment);
            self.with_retry("mkdir", cancel, || self.remote.mkdir(&prefix))
                .await?;
        }
        Ok(())
    }

    /// Runs a remote operation with exponential backoff on transient errors
    ///
    /// Gives up immediately on permanent errors, after `max_attempts` on
    /// transient ones, and as soon as shutdown is requested.
    async fn with_retry<F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationToken,
        f: F,
    ) -> Result<(), RemoteError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<(), RemoteError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(()) => {
                    if attempt > 0 {
                        info!(operation, attempt, "Operation succeeded after retry");
                    }
                    return Ok(());
                }
                Err(err)
                    if err.is_transient()
                        && attempt + 1 < self.retry.max_attempts
                        && !cancel.is_cancelled() =>
                {
                    let delay = self.retry.base_delay * 2u32.pow(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn dir_record_entry() -> RecordEntry {
    RecordEntry {
        kind: EntryKind::Directory,
        size: 0,
        modified: Utc::now(),
        fingerprint: None,
        synced_at: Utc::now(),
    }
}

fn writes_remote(actions: &[SyncAction]) -> bool {
    actions.iter().any(|a| {
        matches!(
            a,
            SyncAction::Upload(_)
                | SyncAction::CreateRemoteDir(_)
                | SyncAction::Conflict {
                    winner: Side::Local,
                    ..
                }
        )
    })
}

// ============================================================================
// Tests
// ============================================================================
