//! Remote tree walk
//!
//! Builds a [`Snapshot`] of a pair's remote folder by listing directories
//! through the [`RemoteStore`] port, breadth-first. The same ignore set used
//! for the local scan applies, so an excluded path is invisible on both
//! sides of the diff.

use skydir_core::domain::entry::{EntryKind, FileEntry, Side, Snapshot};
use skydir_core::domain::newtypes::{Fingerprint, RelPath};
use skydir_core::ports::remote_store::{RemoteEntry, RemoteStore};
use tracing::{debug, warn};

use crate::scanner::IgnoreSet;
use crate::EngineError;

/// Walks the remote folder at `root` into a snapshot
///
/// Returns an empty snapshot when the root does not exist yet (first sync
/// of a pair); the executor creates it on demand before the first upload.
///
/// # Errors
/// Returns `EngineError::Remote` when a listing fails after the adapter's
/// own error classification (transient failures here abort the pass; the
/// next trigger retries).
pub async fn remote_snapshot(
    remote: &dyn RemoteStore,
    root: &str,
    ignore: &IgnoreSet,
) -> Result<Snapshot, EngineError> {
    let mut snapshot = Snapshot::new(Side::Remote);

    if remote.stat(root).await?.is_none() {
        debug!(root, "Remote root does not exist yet, snapshot is empty");
        return Ok(snapshot);
    }

    let mut queue: Vec<String> = vec![root.to_string()];

    while let Some(dir) = queue.pop() {
        let entries = remote.list(&dir).await?;

        for entry in entries {
            let Some(rel) = relativize(&entry, root) else {
                warn!(path = %entry.path, root, "Remote entry outside pair root, skipping");
                continue;
            };

            if ignore.matches(&rel) {
                debug!(path = %rel, "Remote entry ignored by pattern");
                continue;
            }

            let file_entry = match entry.kind {
                EntryKind::Directory => {
                    queue.push(entry.path.clone());
                    FileEntry::directory(rel, entry.modified)
                }
                EntryKind::File => {
                    let mut fe = FileEntry::file(rel, entry.size, entry.modified);
                    if let Some(ref raw) = entry.fingerprint {
                        match Fingerprint::new(raw.clone()) {
                            Ok(fp) => fe = fe.with_fingerprint(fp),
                            Err(err) => {
                                warn!(path = %entry.path, error = %err, "Unusable remote hash")
                            }
                        }
                    }
                    fe
                }
            };
            snapshot.insert(file_entry);
        }
    }

    debug!(root, entries = snapshot.len(), "Remote walk complete");
    Ok(snapshot)
}

/// Maps a remote entry's full path to a pair-relative path
fn relativize(entry: &RemoteEntry, root: &str) -> Option<RelPath> {
    let root = root.trim_end_matches('/');
    let rest = entry.path.strip_prefix(root)?.strip_prefix('/')?;
    RelPath::new(rest).ok()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRemoteStore;
    use chrono::Utc;

    fn rel(s: &str) -> RelPath {
        RelPath::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_missing_root_yields_empty_snapshot() {
        let remote = InMemoryRemoteStore::new();
        let snap = remote_snapshot(&remote, "/SkyDir/docs", &IgnoreSet::default())
            .await
            .unwrap();
        assert!(snap.is_empty());
        assert_eq!(snap.side(), Side::Remote);
    }

    #[tokio::test]
    async fn test_walk_collects_nested_entries() {
        let remote = InMemoryRemoteStore::new();
        remote.seed_dir("/SkyDir/docs");
        remote.seed_dir("/SkyDir/docs/sub");
        remote.seed_file("/SkyDir/docs/a.txt", b"aaa", Utc::now());
        remote.seed_file("/SkyDir/docs/sub/b.txt", b"bbbb", Utc::now());

        let snap = remote_snapshot(&remote, "/SkyDir/docs", &IgnoreSet::default())
            .await
            .unwrap();

        assert_eq!(snap.len(), 3);
        assert_eq!(snap.get(&rel("a.txt")).unwrap().size, 3);
        assert_eq!(
            snap.get(&rel("sub")).unwrap().kind,
            EntryKind::Directory
        );
        assert_eq!(snap.get(&rel("sub/b.txt")).unwrap().size, 4);
        assert!(
            snap.get(&rel("a.txt")).unwrap().fingerprint.is_some(),
            "remote listing carries a hash"
        );
    }

    #[tokio::test]
    async fn test_ignored_remote_subtree_is_pruned() {
        let remote = InMemoryRemoteStore::new();
        remote.seed_dir("/r");
        remote.seed_dir("/r/.git");
        remote.seed_file("/r/.git/config", b"x", Utc::now());
        remote.seed_file("/r/keep.txt", b"x", Utc::now());

        let ignore = IgnoreSet::compile(&[".git".to_string()]);
        let snap = remote_snapshot(&remote, "/r", &ignore).await.unwrap();

        assert_eq!(snap.len(), 1);
        assert!(snap.contains(&rel("keep.txt")));
    }
}
