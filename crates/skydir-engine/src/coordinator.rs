//! Trigger coordinator
//!
//! Merges the periodic timer and the debounced filesystem triggers into one
//! serialized stream of sync requests, and guarantees that at most one
//! reconciliation pass runs per pair at any instant. Distinct pairs
//! reconcile fully independently on their own tasks.
//!
//! ## Per-pair state machine
//!
//! ```text
//!            trigger                  pass done
//!   Idle ─────────────→ Running ─────────────────→ Idle
//!                         │  ↑
//!                 trigger │  │ pass done (immediately
//!                         ▼  │ starts another pass)
//!                  RunningRequeued
//! ```
//!
//! The state is a single `AtomicU8` mutated only with `compare_exchange`;
//! no lock is ever held across the (long, I/O-bound) reconciliation itself,
//! so triggers for other pairs are never blocked. A trigger landing on a
//! running pair degrades to a requeue mark, which collapses any number of
//! triggers into exactly one follow-up pass.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use skydir_core::domain::newtypes::PairId;
use skydir_core::domain::pair::{PairConfig, SyncMode};
use skydir_core::ports::record_store::RecordStore;
use skydir_core::ports::remote_store::RemoteStore;
use skydir_core::ports::Fingerprinter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::debounce::{DebouncedTriggerQueue, PathRouter};
use crate::diff::DiffEngine;
use crate::executor::{Executor, PassReport, RetryPolicy};
use crate::remote_walk::remote_snapshot;
use crate::scanner::{scan, IgnoreSet};
use crate::EngineError;

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_REQUEUED: u8 = 2;

/// Observable state of a pair's reconciliation machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairState {
    Idle,
    Running,
    RunningRequeued,
}

impl std::fmt::Display for PairState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairState::Idle => write!(f, "idle"),
            PairState::Running => write!(f, "running"),
            PairState::RunningRequeued => write!(f, "running (requeued)"),
        }
    }
}

/// What caused a sync request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Periodic timer fired
    Timer,
    /// Debounced filesystem change
    Watch,
    /// Explicit request (CLI, startup)
    Manual,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Timer => write!(f, "timer"),
            Trigger::Watch => write!(f, "watch"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

/// A request to reconcile one pair
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub pair: PairId,
    pub trigger: Trigger,
}

/// Status snapshot for one pair, as exposed by [`Coordinator::status`]
#[derive(Debug, Clone, Serialize)]
pub struct PairStatus {
    pub pair: PairId,
    pub mode: SyncMode,
    pub state: PairState,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

// ============================================================================
// PairRuntime
// ============================================================================

/// Per-pair runtime state: configuration, state machine, status fields
struct PairRuntime {
    config: PairConfig,
    state: AtomicU8,
    last_success: Mutex<Option<DateTime<Utc>>>,
    last_error: Mutex<Option<String>>,
}

impl PairRuntime {
    fn new(config: PairConfig) -> Self {
        Self {
            config,
            state: AtomicU8::new(STATE_IDLE),
            last_success: Mutex::new(None),
            last_error: Mutex::new(None),
        }
    }

    /// Claim the pair for a pass. Returns `true` when the caller now owns
    /// the Running state; `false` means a pass is already running and a
    /// requeue mark was left instead.
    fn try_begin(&self) -> bool {
        if self
            .state
            .compare_exchange(STATE_IDLE, STATE_RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            return true;
        }
        // Already running: collapse this trigger into a requeue mark.
        let _ = self.state.compare_exchange(
            STATE_RUNNING,
            STATE_REQUEUED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        false
    }

    /// Release the pair after a pass. Returns `true` when a trigger arrived
    /// during the pass: the state went back to Running and the caller must
    /// immediately run another pass.
    fn finish_pass(&self) -> bool {
        if self
            .state
            .compare_exchange(STATE_RUNNING, STATE_IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            return false;
        }
        // State was RunningRequeued: take the requeue and keep running.
        self.state.store(STATE_RUNNING, Ordering::Release);
        true
    }

    /// Drop any claim, used when shutdown declines a requeue
    fn force_idle(&self) {
        self.state.store(STATE_IDLE, Ordering::Release);
    }

    fn observed_state(&self) -> PairState {
        match self.state.load(Ordering::Acquire) {
            STATE_RUNNING => PairState::Running,
            STATE_REQUEUED => PairState::RunningRequeued,
            _ => PairState::Idle,
        }
    }

    fn record_outcome(&self, result: &Result<PassReport, EngineError>) {
        match result {
            Ok(report) if report.is_clean() => {
                *self.last_success.lock().unwrap() = Some(Utc::now());
                *self.last_error.lock().unwrap() = None;
            }
            Ok(report) => {
                *self.last_error.lock().unwrap() =
                    Some(format!("{} actions failed", report.failures.len()));
            }
            Err(err) => {
                *self.last_error.lock().unwrap() = Some(format!("{err:#}"));
            }
        }
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Serializes reconciliation passes per pair and runs them end to end
pub struct Coordinator {
    pairs: DashMap<PairId, Arc<PairRuntime>>,
    remote: Arc<dyn RemoteStore>,
    records: Arc<dyn RecordStore>,
    diff: DiffEngine,
    executor: Executor,
    shutdown: CancellationToken,
}

impl Coordinator {
    /// Wire up a coordinator over the given pairs and ports
    pub fn new(
        pair_configs: Vec<PairConfig>,
        remote: Arc<dyn RemoteStore>,
        records: Arc<dyn RecordStore>,
        fingerprinter: Arc<dyn Fingerprinter>,
        retry: RetryPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        let pairs = DashMap::new();
        for config in pair_configs {
            pairs.insert(config.id.clone(), Arc::new(PairRuntime::new(config)));
        }
        Self {
            pairs,
            remote: remote.clone(),
            records: records.clone(),
            diff: DiffEngine::new(fingerprinter.clone()),
            executor: Executor::new(remote, records, fingerprinter).with_retry_policy(retry),
            shutdown,
        }
    }

    /// Configured pair ids, sorted
    #[must_use]
    pub fn pair_ids(&self) -> Vec<PairId> {
        let mut ids: Vec<PairId> = self.pairs.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Local roots for wiring the watcher, sorted by pair id
    #[must_use]
    pub fn pair_roots(&self) -> Vec<(PairId, std::path::PathBuf)> {
        let mut roots: Vec<_> = self
            .pairs
            .iter()
            .map(|e| (e.key().clone(), e.value().config.local_root.clone()))
            .collect();
        roots.sort_by(|a, b| a.0.cmp(&b.0));
        roots
    }

    /// Per-pair status, sorted by pair id
    #[must_use]
    pub fn status(&self) -> Vec<PairStatus> {
        let mut statuses: Vec<PairStatus> = self
            .pairs
            .iter()
            .map(|entry| {
                let rt = entry.value();
                PairStatus {
                    pair: rt.config.id.clone(),
                    mode: rt.config.mode,
                    state: rt.observed_state(),
                    last_success: *rt.last_success.lock().unwrap(),
                    last_error: rt.last_error.lock().unwrap().clone(),
                }
            })
            .collect();
        statuses.sort_by(|a, b| a.pair.cmp(&b.pair));
        statuses
    }

    /// One-shot reconciliation of a single pair (CLI `sync` command)
    ///
    /// Goes through the same state guard as triggered passes. If a trigger
    /// lands while this pass runs, the requeued follow-up pass runs here
    /// too and the last report is returned.
    ///
    /// # Errors
    /// `UnknownPair` for an unconfigured id, `Busy` when a pass is already
    /// running, or the pass-level error that aborted reconciliation.
    pub async fn run_once(&self, pair: &PairId) -> Result<PassReport, EngineError> {
        let runtime = self
            .pairs
            .get(pair)
            .map(|e| e.value().clone())
            .ok_or_else(|| EngineError::UnknownPair(pair.clone()))?;

        if !runtime.try_begin() {
            return Err(EngineError::Busy(pair.clone()));
        }

        loop {
            let result = self.reconcile(&runtime).await;
            runtime.record_outcome(&result);

            if runtime.finish_pass() {
                if self.shutdown.is_cancelled() {
                    runtime.force_idle();
                    return result;
                }
                info!(pair = %runtime.config.id, "Trigger arrived during pass, running again");
                continue;
            }
            return result;
        }
    }

    /// Daemon loop: consumes sync requests until shutdown
    ///
    /// Each accepted request spawns an independent task for its pair, so
    /// one pair's long transfer never delays another pair's pass.
    pub async fn run(self: Arc<Self>, mut requests: mpsc::Receiver<SyncRequest>) {
        info!(pairs = self.pairs.len(), "Trigger coordinator starting");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested, coordinator stops accepting triggers");
                    break;
                }
                request = requests.recv() => match request {
                    Some(request) => self.dispatch(request),
                    None => {
                        info!("Trigger channel closed, coordinator stopping");
                        break;
                    }
                }
            }
        }

        info!("Trigger coordinator stopped");
    }

    /// Routes one request into its pair's state machine
    fn dispatch(self: &Arc<Self>, request: SyncRequest) {
        let Some(runtime) = self.pairs.get(&request.pair).map(|e| e.value().clone()) else {
            warn!(pair = %request.pair, "Request for unknown pair dropped");
            return;
        };

        if !runtime.try_begin() {
            debug!(pair = %request.pair, trigger = %request.trigger,
                "Pass already running, trigger requeued");
            return;
        }

        debug!(pair = %request.pair, trigger = %request.trigger, "Starting reconciliation pass");
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let result = this.reconcile(&runtime).await;
                runtime.record_outcome(&result);
                if let Err(err) = &result {
                    error!(pair = %runtime.config.id, error = %format!("{err:#}"), "Pass failed");
                }

                if !runtime.finish_pass() {
                    break;
                }
                if this.shutdown.is_cancelled() {
                    debug!(pair = %runtime.config.id, "Declining requeue, shutdown in progress");
                    runtime.force_idle();
                    break;
                }
                info!(pair = %runtime.config.id, "Requeued trigger, starting another pass");
            }
        });
    }

    /// One full reconciliation pass: snapshots, diff, execute
    #[tracing::instrument(skip_all, fields(pair = %runtime.config.id))]
    async fn reconcile(&self, runtime: &PairRuntime) -> Result<PassReport, EngineError> {
        let pair = &runtime.config;
        let ignore = IgnoreSet::compile(&pair.ignore);

        self.prepare_local_root(pair).await?;

        let local = scan(&pair.local_root, &ignore).await?;
        let remote = remote_snapshot(self.remote.as_ref(), &pair.remote_root, &ignore).await?;
        let record = self.records.load(&pair.id).await?;

        let outcome = self
            .diff
            .diff(&local, &remote, &record, pair.mode, &pair.local_root)
            .await;

        debug!(
            actions = outcome.actions.len(),
            forget = outcome.forget.len(),
            "Diff computed"
        );

        Ok(self
            .executor
            .execute(pair, outcome, &remote, &self.shutdown)
            .await)
    }

    /// Ensures the pair's local root exists before scanning
    ///
    /// A missing root is created when the policy may write locally;
    /// otherwise it is a pass-level filesystem error.
    async fn prepare_local_root(&self, pair: &PairConfig) -> Result<(), EngineError> {
        match tokio::fs::metadata(&pair.local_root).await {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(EngineError::fs(
                &pair.local_root,
                std::io::Error::new(std::io::ErrorKind::Other, "local root is not a directory"),
            )),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if pair.mode.allows_download() {
                    info!(root = %pair.local_root.display(), "Creating missing local root");
                    tokio::fs::create_dir_all(&pair.local_root)
                        .await
                        .map_err(|e| EngineError::fs(&pair.local_root, e))
                } else {
                    Err(EngineError::fs(&pair.local_root, err))
                }
            }
            Err(err) => Err(EngineError::fs(&pair.local_root, err)),
        }
    }
}

// ============================================================================
// Trigger sources
// ============================================================================

/// Spawns the periodic timer trigger source
///
/// Every pair gets a request per tick; the first tick fires immediately so
/// the daemon reconciles on startup. The task ends on shutdown or when the
/// request channel closes.
pub fn spawn_timer_triggers(
    pairs: Vec<PairId>,
    interval: Duration,
    tx: mpsc::Sender<SyncRequest>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    for pair in &pairs {
                        let request = SyncRequest { pair: pair.clone(), trigger: Trigger::Timer };
                        if tx.send(request).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    })
}

/// Spawns the debounced watch trigger source
///
/// Raw changed paths are routed to their owning pair and coalesced in a
/// [`DebouncedTriggerQueue`]; settled pairs become sync requests.
pub fn spawn_watch_triggers(
    mut raw_events: mpsc::Receiver<std::path::PathBuf>,
    router: PathRouter,
    quiet: Duration,
    tx: mpsc::Sender<SyncRequest>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut queue = DebouncedTriggerQueue::new(quiet);
        let poll_every = (quiet / 4).max(Duration::from_millis(100));
        let mut ticker = tokio::time::interval(poll_every);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = raw_events.recv() => match event {
                    Some(path) => match router.route(&path) {
                        Some(pair) => queue.push(pair.clone()),
                        None => debug!(path = %path.display(), "Change outside any pair root"),
                    },
                    None => break,
                },
                _ = ticker.tick() => {
                    for pair in queue.poll() {
                        let request = SyncRequest { pair, trigger: Trigger::Watch };
                        if tx.send(request).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Sha256Fingerprinter;
    use crate::memory::{InMemoryRecordStore, InMemoryRemoteStore};
    use skydir_core::ports::remote_store::{RemoteEntry, RemoteError};
    use std::path::Path;
    use std::sync::atomic::AtomicI32;

    fn pair_id(s: &str) -> PairId {
        PairId::new(s).unwrap()
    }

    fn test_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        }
    }

    // ------------------------------------------------------------------
    // State machine unit tests
    // ------------------------------------------------------------------

    fn runtime() -> PairRuntime {
        PairRuntime::new(PairConfig {
            id: pair_id("docs"),
            local_root: std::path::PathBuf::from("/tmp/docs"),
            remote_root: "/r/docs".to_string(),
            mode: SyncMode::Bidirectional,
            ignore: vec![],
        })
    }

    #[test]
    fn test_state_machine_happy_path() {
        let rt = runtime();
        assert_eq!(rt.observed_state(), PairState::Idle);

        assert!(rt.try_begin());
        assert_eq!(rt.observed_state(), PairState::Running);

        assert!(!rt.finish_pass(), "no trigger arrived, back to idle");
        assert_eq!(rt.observed_state(), PairState::Idle);
    }

    #[test]
    fn test_trigger_during_pass_requeues_once() {
        let rt = runtime();
        assert!(rt.try_begin());

        // Any number of triggers during the pass collapses into one requeue.
        assert!(!rt.try_begin());
        assert!(!rt.try_begin());
        assert!(!rt.try_begin());
        assert_eq!(rt.observed_state(), PairState::RunningRequeued);

        // Finishing consumes the requeue and keeps the pair claimed.
        assert!(rt.finish_pass());
        assert_eq!(rt.observed_state(), PairState::Running);

        // The follow-up pass finishes with no further trigger.
        assert!(!rt.finish_pass());
        assert_eq!(rt.observed_state(), PairState::Idle);
    }

    // ------------------------------------------------------------------
    // Coordinator integration tests
    // ------------------------------------------------------------------

    /// Remote store wrapper that measures reconciliation overlap: the first
    /// remote call of every pass is slowed down and concurrency is counted.
    struct OverlapProbe {
        inner: InMemoryRemoteStore,
        current: AtomicI32,
        max_seen: AtomicI32,
        stat_calls: AtomicI32,
    }

    impl OverlapProbe {
        fn new(inner: InMemoryRemoteStore) -> Self {
            Self {
                inner,
                current: AtomicI32::new(0),
                max_seen: AtomicI32::new(0),
                stat_calls: AtomicI32::new(0),
            }
        }

        async fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl skydir_core::ports::RemoteStore for OverlapProbe {
        async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
            self.inner.list(path).await
        }
        async fn stat(&self, path: &str) -> Result<Option<RemoteEntry>, RemoteError> {
            self.stat_calls.fetch_add(1, Ordering::SeqCst);
            self.enter().await;
            let result = self.inner.stat(path).await;
            self.exit();
            result
        }
        async fn upload(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
            self.inner.upload(local, remote).await
        }
        async fn download(&self, remote: &str, local: &Path) -> Result<(), RemoteError> {
            self.inner.download(remote, local).await
        }
        async fn delete(&self, path: &str) -> Result<(), RemoteError> {
            self.inner.delete(path).await
        }
        async fn mkdir(&self, path: &str) -> Result<(), RemoteError> {
            self.inner.mkdir(path).await
        }
    }

    fn coordinator_with(
        tmp: &tempfile::TempDir,
        remote: Arc<dyn skydir_core::ports::RemoteStore>,
        shutdown: CancellationToken,
    ) -> Arc<Coordinator> {
        let pair = PairConfig {
            id: pair_id("docs"),
            local_root: tmp.path().to_path_buf(),
            remote_root: "/r/docs".to_string(),
            mode: SyncMode::Bidirectional,
            ignore: vec![],
        };
        Arc::new(Coordinator::new(
            vec![pair],
            remote,
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(Sha256Fingerprinter::new()),
            test_retry(),
            shutdown,
        ))
    }

    #[tokio::test]
    async fn test_no_two_passes_overlap_under_trigger_burst() {
        let tmp = tempfile::tempdir().unwrap();
        let probe = Arc::new(OverlapProbe::new(InMemoryRemoteStore::new()));
        let shutdown = CancellationToken::new();
        let coordinator = coordinator_with(&tmp, probe.clone(), shutdown.clone());

        let (tx, rx) = mpsc::channel(64);
        let run_task = tokio::spawn(Arc::clone(&coordinator).run(rx));

        // Burst of triggers while the first pass is still in flight.
        for _ in 0..6 {
            tx.send(SyncRequest {
                pair: pair_id("docs"),
                trigger: Trigger::Watch,
            })
            .await
            .unwrap();
        }

        // Let passes drain, then stop the coordinator.
        tokio::time::sleep(Duration::from_millis(400)).await;
        shutdown.cancel();
        run_task.await.unwrap();

        assert_eq!(
            probe.max_seen.load(Ordering::SeqCst),
            1,
            "two passes overlapped for the same pair"
        );
        // One running pass plus exactly one collapsed requeue.
        assert_eq!(probe.stat_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_once_reports_and_updates_status() {
        let tmp = tempfile::tempdir().unwrap();
        tokio::fs::write(tmp.path().join("a.txt"), "hello")
            .await
            .unwrap();
        let remote = Arc::new(InMemoryRemoteStore::new());
        let coordinator = coordinator_with(&tmp, remote.clone(), CancellationToken::new());

        let report = coordinator.run_once(&pair_id("docs")).await.unwrap();
        assert_eq!(report.uploaded, 1);
        assert!(remote.exists("/r/docs/a.txt"));

        let status = coordinator.status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].state, PairState::Idle);
        assert!(status[0].last_success.is_some());
        assert!(status[0].last_error.is_none());

        // Second pass with no changes is a no-op (idempotence).
        let report = coordinator.run_once(&pair_id("docs")).await.unwrap();
        assert_eq!(report.total_applied(), 0);
    }

    #[tokio::test]
    async fn test_run_once_unknown_pair() {
        let tmp = tempfile::tempdir().unwrap();
        let coordinator = coordinator_with(
            &tmp,
            Arc::new(InMemoryRemoteStore::new()),
            CancellationToken::new(),
        );

        let result = coordinator.run_once(&pair_id("nope")).await;
        assert!(matches!(result, Err(EngineError::UnknownPair(_))));
    }

    #[tokio::test]
    async fn test_pass_level_error_lands_in_status() {
        let tmp = tempfile::tempdir().unwrap();
        let remote = Arc::new(InMemoryRemoteStore::new());
        remote.queue_failure("stat", RemoteError::Permanent("auth invalid".into()));
        remote.queue_failure("stat", RemoteError::Permanent("auth invalid".into()));
        let coordinator = coordinator_with(&tmp, remote, CancellationToken::new());

        let result = coordinator.run_once(&pair_id("docs")).await;
        assert!(matches!(result, Err(EngineError::Remote(_))));

        let status = coordinator.status();
        assert!(status[0].last_error.as_deref().unwrap().contains("auth invalid"));
        assert_eq!(status[0].state, PairState::Idle, "state released after failure");
    }

    #[tokio::test]
    async fn test_distinct_pairs_run_independently() {
        let tmp_a = tempfile::tempdir().unwrap();
        let tmp_b = tempfile::tempdir().unwrap();
        tokio::fs::write(tmp_a.path().join("a.txt"), "a").await.unwrap();
        tokio::fs::write(tmp_b.path().join("b.txt"), "b").await.unwrap();

        let remote = Arc::new(InMemoryRemoteStore::new());
        let shutdown = CancellationToken::new();
        let mk_pair = |name: &str, root: &Path, remote_root: &str| PairConfig {
            id: pair_id(name),
            local_root: root.to_path_buf(),
            remote_root: remote_root.to_string(),
            mode: SyncMode::Bidirectional,
            ignore: vec![],
        };
        let coordinator = Arc::new(Coordinator::new(
            vec![
                mk_pair("a", tmp_a.path(), "/r/a"),
                mk_pair("b", tmp_b.path(), "/r/b"),
            ],
            remote.clone(),
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(Sha256Fingerprinter::new()),
            test_retry(),
            shutdown.clone(),
        ));

        let (tx, rx) = mpsc::channel(16);
        let run_task = tokio::spawn(Arc::clone(&coordinator).run(rx));
        for name in ["a", "b"] {
            tx.send(SyncRequest {
                pair: pair_id(name),
                trigger: Trigger::Manual,
            })
            .await
            .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown.cancel();
        run_task.await.unwrap();

        assert!(remote.exists("/r/a/a.txt"));
        assert!(remote.exists("/r/b/b.txt"));
    }
}
