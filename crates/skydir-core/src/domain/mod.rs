//! Domain model for directory-pair synchronization
//!
//! Pure data types with validation; no I/O happens in this module.

pub mod action;
pub mod entry;
pub mod errors;
pub mod newtypes;
pub mod pair;
pub mod record;

pub use action::{ConflictReason, DiffOutcome, SyncAction};
pub use entry::{EntryKind, FileEntry, Side, Snapshot};
pub use errors::DomainError;
pub use newtypes::{Fingerprint, PairId, RelPath};
pub use pair::{PairConfig, SyncMode};
pub use record::{ReconciliationRecord, RecordEntry};
