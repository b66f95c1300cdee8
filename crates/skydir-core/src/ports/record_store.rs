//! Reconciliation record store port (driven/secondary port)
//!
//! Durable storage of per-pair reconciliation records. Single-entry updates
//! must be atomic: the executor calls [`RecordStore::upsert`] once per
//! confirmed action, and a crash between two upserts must leave every
//! previously-written entry intact.

use chrono::{DateTime, Utc};

use crate::domain::newtypes::{PairId, RelPath};
use crate::domain::record::{ReconciliationRecord, RecordEntry};

/// Port trait for reconciliation record persistence
///
/// Errors are adapter-specific and carried as `anyhow::Error`; the engine
/// treats any store failure for an action as fatal for that action only.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Loads the full record for a pair (empty record if none exists yet)
    async fn load(&self, pair: &PairId) -> anyhow::Result<ReconciliationRecord>;

    /// Inserts or replaces the entry for one path, atomically
    async fn upsert(
        &self,
        pair: &PairId,
        path: &RelPath,
        entry: &RecordEntry,
    ) -> anyhow::Result<()>;

    /// Removes the entry for one path (no-op if absent)
    async fn remove(&self, pair: &PairId, path: &RelPath) -> anyhow::Result<()>;

    /// Most recent `synced_at` over all of a pair's entries
    async fn last_synced(&self, pair: &PairId) -> anyhow::Result<Option<DateTime<Utc>>>;
}
