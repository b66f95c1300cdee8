//! Per-pair trigger debouncing
//!
//! Editors and build tools write files in bursts. [`DebouncedTriggerQueue`]
//! coalesces every change landing on a pair within a quiet window into a
//! single trigger: each new event resets the pair's timer, and the pair is
//! only emitted once it has been quiet for the full window.
//!
//! [`PathRouter`] maps a raw changed path to the pair that owns it
//! (longest matching root wins, so nested pair roots behave correctly).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use skydir_core::domain::newtypes::PairId;
use tracing::debug;

/// Coalesces change bursts into one trigger per pair
pub struct DebouncedTriggerQueue {
    pending: HashMap<PairId, Instant>,
    quiet: Duration,
}

impl DebouncedTriggerQueue {
    /// Create a queue with the given quiet window
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            quiet,
        }
    }

    /// Register a change for a pair, resetting its quiet timer
    pub fn push(&mut self, pair: PairId) {
        debug!(pair = %pair, "Change registered, debounce timer reset");
        self.pending.insert(pair, Instant::now());
    }

    /// Returns the pairs whose last change is older than the quiet window
    ///
    /// Settled pairs are removed from the queue; pairs still inside the
    /// window remain pending.
    pub fn poll(&mut self) -> Vec<PairId> {
        let now = Instant::now();
        let settled: Vec<PairId> = self
            .pending
            .iter()
            .filter(|(_, at)| now.duration_since(**at) >= self.quiet)
            .map(|(pair, _)| pair.clone())
            .collect();

        for pair in &settled {
            self.pending.remove(pair);
        }
        if !settled.is_empty() {
            debug!(count = settled.len(), "Settled pairs ready for sync");
        }
        settled
    }

    /// Number of pairs still inside their quiet window
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether no pair is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Maps changed paths to the owning directory pair
pub struct PathRouter {
    roots: Vec<(PairId, PathBuf)>,
}

impl PathRouter {
    /// Build a router over the configured pair roots
    #[must_use]
    pub fn new(roots: Vec<(PairId, PathBuf)>) -> Self {
        Self { roots }
    }

    /// The pair whose root contains `path`; the longest root wins
    #[must_use]
    pub fn route(&self, path: &Path) -> Option<&PairId> {
        self.roots
            .iter()
            .filter(|(_, root)| path.starts_with(root))
            .max_by_key(|(_, root)| root.components().count())
            .map(|(pair, _)| pair)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(s: &str) -> PairId {
        PairId::new(s).unwrap()
    }

    #[test]
    fn test_burst_collapses_to_single_trigger() {
        let mut queue = DebouncedTriggerQueue::new(Duration::from_millis(0));
        queue.push(pair("docs"));
        queue.push(pair("docs"));
        queue.push(pair("docs"));
        assert_eq!(queue.pending_count(), 1);

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(queue.poll(), vec![pair("docs")]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_recent_events_stay_pending() {
        let mut queue = DebouncedTriggerQueue::new(Duration::from_secs(60));
        queue.push(pair("docs"));
        assert!(queue.poll().is_empty());
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn test_push_resets_quiet_window() {
        let mut queue = DebouncedTriggerQueue::new(Duration::from_millis(50));
        queue.push(pair("docs"));
        std::thread::sleep(Duration::from_millis(30));

        // A fresh change restarts the window.
        queue.push(pair("docs"));
        std::thread::sleep(Duration::from_millis(30));
        assert!(queue.poll().is_empty());

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(queue.poll(), vec![pair("docs")]);
    }

    #[test]
    fn test_pairs_settle_independently() {
        let mut queue = DebouncedTriggerQueue::new(Duration::from_millis(40));
        queue.push(pair("old"));
        std::thread::sleep(Duration::from_millis(50));
        queue.push(pair("new"));

        let settled = queue.poll();
        assert_eq!(settled, vec![pair("old")]);
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn test_router_picks_owning_pair() {
        let router = PathRouter::new(vec![
            (pair("docs"), PathBuf::from("/home/u/sync/docs")),
            (pair("photos"), PathBuf::from("/home/u/sync/photos")),
        ]);

        assert_eq!(
            router.route(Path::new("/home/u/sync/docs/a/b.txt")),
            Some(&pair("docs"))
        );
        assert_eq!(router.route(Path::new("/home/u/elsewhere/x")), None);
    }

    #[test]
    fn test_router_longest_root_wins() {
        let router = PathRouter::new(vec![
            (pair("all"), PathBuf::from("/home/u/sync")),
            (pair("docs"), PathBuf::from("/home/u/sync/docs")),
        ]);

        assert_eq!(
            router.route(Path::new("/home/u/sync/docs/a.txt")),
            Some(&pair("docs"))
        );
        assert_eq!(
            router.route(Path::new("/home/u/sync/other.txt")),
            Some(&pair("all"))
        );
    }
}
