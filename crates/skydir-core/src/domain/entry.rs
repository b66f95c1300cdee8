//! Snapshots: point-in-time enumerations of a directory tree
//!
//! A [`Snapshot`] is produced by the local scanner or the remote walker and
//! consumed by the diff engine. It maps each relative path to a single
//! [`FileEntry`]; a path denotes exactly one kind of object.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{Fingerprint, RelPath};

/// Which side of a directory pair a snapshot (or entry) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The local filesystem tree
    Local,
    /// The remote folder on the cloud backend
    Remote,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Local => write!(f, "local"),
            Side::Remote => write!(f, "remote"),
        }
    }
}

/// Kind of filesystem object an entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    /// Storage name used by the record store
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        }
    }
}

/// One filesystem object within a scanned tree
///
/// The content fingerprint is optional: the scanner never computes it
/// eagerly, and directory entries never have one. The diff engine requests
/// it lazily when size+mtime alone cannot classify a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the pair root, slash-separated
    pub path: RelPath,
    /// File or directory
    pub kind: EntryKind,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Last modification timestamp
    pub modified: DateTime<Utc>,
    /// Content fingerprint, when known
    pub fingerprint: Option<Fingerprint>,
}

impl FileEntry {
    /// Create a file entry without a fingerprint
    #[must_use]
    pub fn file(path: RelPath, size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            path,
            kind: EntryKind::File,
            size,
            modified,
            fingerprint: None,
        }
    }

    /// Create a directory entry
    #[must_use]
    pub fn directory(path: RelPath, modified: DateTime<Utc>) -> Self {
        Self {
            path,
            kind: EntryKind::Directory,
            size: 0,
            modified,
            fingerprint: None,
        }
    }

    /// Attach a known fingerprint
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Whether this entry describes a directory
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Point-in-time enumeration of one side of a directory pair
///
/// Order-irrelevant mapping from relative path to entry. Inserting an entry
/// for an existing path replaces it, preserving the one-path-one-kind
/// invariant.
#[derive(Debug, Clone)]
pub struct Snapshot {
    side: Side,
    captured_at: DateTime<Utc>,
    entries: HashMap<RelPath, FileEntry>,
}

impl Snapshot {
    /// Create an empty snapshot for the given side, captured now
    #[must_use]
    pub fn new(side: Side) -> Self {
        Self {
            side,
            captured_at: Utc::now(),
            entries: HashMap::new(),
        }
    }

    /// Which side this snapshot was taken from
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// When the capture started
    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Insert an entry, replacing any previous entry at the same path
    pub fn insert(&mut self, entry: FileEntry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    /// Look up an entry by path
    #[must_use]
    pub fn get(&self, path: &RelPath) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    /// Whether the snapshot contains the path
    #[must_use]
    pub fn contains(&self, path: &RelPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all paths
    pub fn paths(&self) -> impl Iterator<Item = &RelPath> {
        self.entries.keys()
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (&RelPath, &FileEntry)> {
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
    fn test_insert_replaces_same_path() {
        let mut snap = Snapshot::new(Side::Local);
        snap.insert(FileEntry::file(rel("a.txt"), 10, Utc::now()));
        snap.insert(FileEntry::file(rel("a.txt"), 20, Utc::now()));

        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get(&rel("a.txt")).unwrap().size, 20);
    }

    #[test]
    fn test_directory_entry_has_no_size() {
        let entry = FileEntry::directory(rel("photos"), Utc::now());
        assert!(entry.is_directory());
        assert_eq!(entry.size, 0);
        assert!(entry.fingerprint.is_none());
    }

    #[test]
    fn test_side_tag() {
        let snap = Snapshot::new(Side::Remote);
        assert_eq!(snap.side(), Side::Remote);
        assert!(snap.is_empty());
    }
}
