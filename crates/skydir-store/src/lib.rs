//! SkyDir Store - durable reconciliation record persistence
//!
//! SQLite-backed implementation of the
//! [`RecordStore`](skydir_core::ports::RecordStore) port. One row per
//! (pair, relative path); every upsert/remove is a single statement, which
//! gives the executor the atomic per-entry updates the crash-safety
//! protocol relies on.

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteRecordStore;

use thiserror::Error;

/// Errors raised by the store adapter
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not open or create the database
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be decoded into its domain type
    #[error("Corrupt record row: {0}")]
    CorruptRow(String),

    /// Underlying SQL error
    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),
}
