//! SQLite implementation of the RecordStore port
//!
//! ## Type Mapping
//!
//! | Domain Type     | SQL Type | Strategy                                   |
//! |-----------------|----------|--------------------------------------------|
//! | PairId, RelPath | TEXT     | string via `.as_str()` / validated `new()` |
//! | EntryKind       | TEXT     | `"file"` / `"directory"`                   |
//! | Fingerprint     | TEXT     | hex string, nullable                       |
//! | DateTime<Utc>   | TEXT     | RFC 3339 via `to_rfc3339()`                |

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use skydir_core::domain::entry::EntryKind;
use skydir_core::domain::newtypes::{Fingerprint, PairId, RelPath};
use skydir_core::domain::record::{ReconciliationRecord, RecordEntry};
use skydir_core::ports::record_store::RecordStore;

use crate::StoreError;

/// SQLite-backed reconciliation record store
///
/// All operations go through a connection pool; each upsert/remove is a
/// single statement and therefore atomic, which is what the executor's
/// write-after-confirm protocol requires.
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Creates a store over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Row conversion helpers
// ============================================================================

fn kind_to_string(kind: EntryKind) -> &'static str {
    kind.as_str()
}

fn kind_from_string(s: &str) -> Result<EntryKind, StoreError> {
    match s {
        "file" => Ok(EntryKind::File),
        "directory" => Ok(EntryKind::Directory),
        other => Err(StoreError::CorruptRow(format!("unknown kind: {other}"))),
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow(format!("bad datetime '{s}': {e}")))
}

fn row_to_entry(row: &SqliteRow) -> Result<(RelPath, RecordEntry), StoreError> {
    let rel_path: String = row.try_get("rel_path")?;
    let kind: String = row.try_get("kind")?;
    let size: i64 = row.try_get("size")?;
    let modified: String = row.try_get("modified")?;
    let fingerprint: Option<String> = row.try_get("fingerprint")?;
    let synced_at: String = row.try_get("synced_at")?;

    let path = RelPath::new(rel_path).map_err(|e| StoreError::CorruptRow(e.to_string()))?;
    let fingerprint = fingerprint
        .map(Fingerprint::new)
        .transpose()
        .map_err(|e| StoreError::CorruptRow(e.to_string()))?;

    Ok((
        path,
        RecordEntry {
            kind: kind_from_string(&kind)?,
            size: size as u64,
            modified: parse_datetime(&modified)?,
            fingerprint,
            synced_at: parse_datetime(&synced_at)?,
        },
    ))
}

// ============================================================================
// RecordStore implementation
// ============================================================================

#[async_trait::async_trait]
impl RecordStore for SqliteRecordStore {
    async fn load(&self, pair: &PairId) -> anyhow::Result<ReconciliationRecord> {
        let rows = sqlx::query(
            "SELECT rel_path, kind, size, modified, fingerprint, synced_at \
             FROM record_entries WHERE pair_id = ?",
        )
        .bind(pair.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        let mut entries = HashMap::with_capacity(rows.len());
        for row in &rows {
            let (path, entry) = row_to_entry(row)?;
            entries.insert(path, entry);
        }

        tracing::debug!(pair = %pair, entries = entries.len(), "Record loaded");
        Ok(ReconciliationRecord::from_entries(entries))
    }

    async fn upsert(
        &self,
        pair: &PairId,
        path: &RelPath,
        entry: &RecordEntry,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO record_entries \
             (pair_id, rel_path, kind, size, modified, fingerprint, synced_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(pair.as_str())
        .bind(path.as_str())
        .bind(kind_to_string(entry.kind))
        .bind(entry.size as i64)
        .bind(entry.modified.to_rfc3339())
        .bind(entry.fingerprint.as_ref().map(Fingerprint::as_str))
        .bind(entry.synced_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;
        Ok(())
    }

    async fn remove(&self, pair: &PairId, path: &RelPath) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM record_entries WHERE pair_id = ? AND rel_path = ?")
            .bind(pair.as_str())
            .bind(path.as_str())
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    async fn last_synced(&self, pair: &PairId) -> anyhow::Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            "SELECT MAX(synced_at) AS latest FROM record_entries WHERE pair_id = ?",
        )
        .bind(pair.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)?;

        let latest: Option<String> = row.try_get("latest").map_err(StoreError::from)?;
        latest.as_deref().map(parse_datetime).transpose().map_err(Into::into)
    }
}
