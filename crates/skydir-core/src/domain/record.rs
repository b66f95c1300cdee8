//! The reconciliation record: last state both sides agreed on
//!
//! One [`ReconciliationRecord`] exists per directory pair. The diff engine
//! reads it to distinguish "changed locally" from "changed remotely" from
//! "deleted"; the executor is its only writer, updating entries one at a
//! time after each confirmed action.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::{EntryKind, FileEntry};
use super::newtypes::{Fingerprint, RelPath};

/// Per-path state recorded at the last successful sync of that path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    /// File or directory
    pub kind: EntryKind,
    /// Size in bytes at last sync (0 for directories)
    pub size: u64,
    /// Modification timestamp at last sync
    pub modified: DateTime<Utc>,
    /// Content fingerprint at last sync, when one was available
    pub fingerprint: Option<Fingerprint>,
    /// When this path last completed a successful action
    pub synced_at: DateTime<Utc>,
}

impl RecordEntry {
    /// Build a record entry from a snapshot entry, stamped now
    #[must_use]
    pub fn from_entry(entry: &FileEntry) -> Self {
        Self {
            kind: entry.kind,
            size: entry.size,
            modified: entry.modified,
            fingerprint: entry.fingerprint.clone(),
            synced_at: Utc::now(),
        }
    }
}

/// The last-known-synchronized state of one directory pair
///
/// Owned and mutated exclusively by the reconciliation executor; the diff
/// engine only ever holds a shared reference.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationRecord {
    entries: HashMap<RelPath, RecordEntry>,
}

impl ReconciliationRecord {
    /// Create an empty record (first sync of a pair)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from already-loaded entries
    #[must_use]
    pub fn from_entries(entries: HashMap<RelPath, RecordEntry>) -> Self {
        Self { entries }
    }

    /// Look up the recorded state for a path
    #[must_use]
    pub fn get(&self, path: &RelPath) -> Option<&RecordEntry> {
        self.entries.get(path)
    }

    /// Whether a path has a recorded state
    #[must_use]
    pub fn contains(&self, path: &RelPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert or replace the entry for a path
    pub fn upsert(&mut self, path: RelPath, entry: RecordEntry) {
        self.entries.insert(path, entry);
    }

    /// Remove the entry for a path (deleted on both sides)
    pub fn remove(&mut self, path: &RelPath) -> Option<RecordEntry> {
        self.entries.remove(path)
    }

    /// Number of recorded paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the record is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all recorded paths
    pub fn paths(&self) -> impl Iterator<Item = &RelPath> {
        self.entries.keys()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (&RelPath, &RecordEntry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(s: &str) -> RelPath {
        RelPath::new(s).unwrap()
    }

    #[test]
    fn test_from_entry_copies_metadata() {
        let now = Utc::now();
        let fp = Fingerprint::new("aa01").unwrap();
        let entry = FileEntry::file(rel("a.txt"), 42, now).with_fingerprint(fp.clone());

        let rec = RecordEntry::from_entry(&entry);
        assert_eq!(rec.kind, EntryKind::File);
        assert_eq!(rec.size, 42);
        assert_eq!(rec.modified, now);
        assert_eq!(rec.fingerprint, Some(fp));
    }

    #[test]
    fn test_upsert_and_remove() {
        let mut record = ReconciliationRecord::new();
        assert!(record.is_empty());

        let entry = RecordEntry::from_entry(&FileEntry::file(rel("a.txt"), 1, Utc::now()));
        record.upsert(rel("a.txt"), entry.clone());
        record.upsert(rel("a.txt"), entry);
        assert_eq!(record.len(), 1);

        assert!(record.remove(&rel("a.txt")).is_some());
        assert!(record.remove(&rel("a.txt")).is_none());
        assert!(record.is_empty());
    }
}
