//! Diff engine: three-way comparison of local, remote, and record
//!
//! For every path in the union of the two snapshots and the reconciliation
//! record, classifies what happened since the last sync and emits the
//! [`SyncAction`]s that move the pair toward its policy-defined target
//! state.
//!
//! ## Change detection
//!
//! "Changed" is measured against the record entry, cheapest check first:
//! a size difference is always a change; matching size and mtime is treated
//! as unchanged without hashing (clock skew or touch-without-write can mask
//! a real change; accepted limitation); only the ambiguous case - same
//! size, different mtime - pays for a fingerprint. Local fingerprints come
//! from the [`Fingerprinter`] port, remote ones from the directory listing.
//!
//! ## Conflict resolution
//!
//! When both sides changed in bidirectional mode the side with the later
//! modification timestamp wins; an exact tie goes to remote. The resolution
//! is embedded in the emitted `Conflict` action, so the executor never
//! re-reads state to apply it.
//!
//! ## Ordering
//!
//! Directory creations come first (parents before children), then transfers
//! in path order, then deletions bottom-up (children before their
//! directory). A recorded directory is only deleted when this pass leaves
//! it empty.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;

use skydir_core::domain::action::{ConflictReason, DiffOutcome, SyncAction};
use skydir_core::domain::entry::{EntryKind, FileEntry, Side, Snapshot};
use skydir_core::domain::newtypes::RelPath;
use skydir_core::domain::pair::SyncMode;
use skydir_core::domain::record::{ReconciliationRecord, RecordEntry};
use skydir_core::ports::Fingerprinter;
use tracing::{debug, warn};

/// Computes sync actions from two snapshots and the reconciliation record
pub struct DiffEngine {
    fingerprinter: Arc<dyn Fingerprinter>,
}

impl DiffEngine {
    /// Create a diff engine using the given fingerprint capability
    pub fn new(fingerprinter: Arc<dyn Fingerprinter>) -> Self {
        Self { fingerprinter }
    }

    /// Computes the ordered action list for one reconciliation pass
    ///
    /// Never fails: a file that cannot be hashed (e.g. deleted while the
    /// pass runs) is conservatively treated as changed and the executor
    /// surfaces any real failure.
    pub async fn diff(
        &self,
        local: &Snapshot,
        remote: &Snapshot,
        record: &ReconciliationRecord,
        mode: SyncMode,
        local_root: &Path,
    ) -> DiffOutcome {
        let mut paths: BTreeSet<RelPath> = BTreeSet::new();
        paths.extend(local.paths().cloned());
        paths.extend(remote.paths().cloned());
        paths.extend(record.paths().cloned());

        let mut raw: Vec<SyncAction> = Vec::new();
        let mut forget: Vec<RelPath> = Vec::new();

        for path in &paths {
            match (local.get(path), remote.get(path), record.get(path)) {
                (None, None, Some(_)) => forget.push(path.clone()),
                (None, None, None) => unreachable!("path came from one of the three sets"),

                (Some(l), Some(r), rec) => {
                    if let Some(action) = self.classify_both(l, r, rec, mode, local_root).await {
                        raw.push(action);
                    }
                }
                (Some(l), None, rec) => {
                    if let Some(action) = self.classify_local_only(l, rec, mode, local_root).await
                    {
                        raw.push(action);
                    }
                }
                (None, Some(r), rec) => {
                    if let Some(action) = classify_remote_only(r, rec, mode) {
                        raw.push(action);
                    }
                }
            }
        }

        finalize(raw, forget, local, remote)
    }

    /// Path present on both sides
    async fn classify_both(
        &self,
        l: &FileEntry,
        r: &FileEntry,
        rec: Option<&RecordEntry>,
        mode: SyncMode,
        local_root: &Path,
    ) -> Option<SyncAction> {
        if l.kind != r.kind {
            warn!(path = %l.path, local = ?l.kind, remote = ?r.kind,
                "Kind mismatch between sides, skipping path");
            return None;
        }
        if l.is_directory() {
            // A directory present on both sides needs nothing.
            return None;
        }

        match rec {
            Some(rec) => {
                let remote_changed = remote_changed(r, rec);
                let local_changed = self.local_changed(l, rec, local_root).await;

                match (local_changed, remote_changed) {
                    (false, false) => None,
                    (true, false) => {
                        if mode.allows_upload() {
                            Some(SyncAction::Upload(l.path.clone()))
                        } else {
                            // Download mode: remote is authoritative, the
                            // local divergence is restored from it.
                            Some(SyncAction::Download(l.path.clone()))
                        }
                    }
                    (false, true) => {
                        if mode.allows_download() {
                            Some(SyncAction::Download(l.path.clone()))
                        } else {
                            // Upload mode: local is authoritative.
                            Some(SyncAction::Upload(l.path.clone()))
                        }
                    }
                    (true, true) => {
                        Some(both_changed(l, r, mode, ConflictReason::BothChanged))
                    }
                }
            }
            None => {
                // Never synced: same content on both sides needs nothing,
                // differing content is a conflict between two new files.
                if l.size == r.size && self.contents_match(l, r, local_root).await {
                    debug!(path = %l.path, "Both sides hold identical unrecorded content");
                    return None;
                }
                Some(both_changed(l, r, mode, ConflictReason::BothNew))
            }
        }
    }

    /// Path present locally, absent remotely
    async fn classify_local_only(
        &self,
        l: &FileEntry,
        rec: Option<&RecordEntry>,
        mode: SyncMode,
        local_root: &Path,
    ) -> Option<SyncAction> {
        if l.is_directory() {
            // A recorded directory that vanished remotely propagates as a
            // local delete (suppressed later unless this pass empties it).
            // New local directories are only materialized remotely as
            // parents of uploads.
            return match (rec, mode) {
                (Some(_), SyncMode::Bidirectional | SyncMode::Download) => {
                    Some(SyncAction::DeleteLocal(l.path.clone()))
                }
                _ => None,
            };
        }

        match rec {
            Some(rec) => match mode {
                // Upload mode mirrors local to remote: restore the file
                // whether or not it changed since the record was written.
                SyncMode::Upload => Some(SyncAction::Upload(l.path.clone())),
                SyncMode::Bidirectional => {
                    if self.local_changed(l, rec, local_root).await {
                        // Edit beats delete: the remote deletion loses.
                        Some(SyncAction::Upload(l.path.clone()))
                    } else {
                        Some(SyncAction::DeleteLocal(l.path.clone()))
                    }
                }
                SyncMode::Download => {
                    if self.local_changed(l, rec, local_root).await {
                        // Deleting the only changed copy would lose data.
                        debug!(path = %l.path,
                            "Local change with remote deletion in download mode, leaving in place");
                        None
                    } else {
                        Some(SyncAction::DeleteLocal(l.path.clone()))
                    }
                }
            },
            None => mode
                .allows_upload()
                .then(|| SyncAction::Upload(l.path.clone())),
        }
    }

    /// Whether the local entry differs from its record entry
    ///
    /// Hashes only in the ambiguous case (same size, different mtime).
    async fn local_changed(&self, entry: &FileEntry, rec: &RecordEntry, local_root: &Path) -> bool {
        if rec.kind != EntryKind::File || entry.size != rec.size {
            return true;
        }
        if entry.modified == rec.modified {
            return false;
        }
        let Some(rec_fp) = &rec.fingerprint else {
            return true;
        };
        match self
            .fingerprinter
            .compute(&entry.path.to_local(local_root))
            .await
        {
            Ok(fp) => fp != *rec_fp,
            Err(err) => {
                warn!(path = %entry.path, error = %err,
                    "Cannot fingerprint local file, assuming changed");
                true
            }
        }
    }

    /// Whether two unrecorded entries hold identical content
    async fn contents_match(&self, l: &FileEntry, r: &FileEntry, local_root: &Path) -> bool {
        let Some(remote_fp) = &r.fingerprint else {
            return false;
        };
        match self
            .fingerprinter
            .compute(&l.path.to_local(local_root))
            .await
        {
            Ok(local_fp) => local_fp == *remote_fp,
            Err(_) => false,
        }
    }
}

/// Whether the remote entry differs from its record entry
fn remote_changed(entry: &FileEntry, rec: &RecordEntry) -> bool {
    if rec.kind != EntryKind::File || entry.size != rec.size {
        return true;
    }
    if entry.modified == rec.modified {
        return false;
    }
    match (&entry.fingerprint, &rec.fingerprint) {
        (Some(a), Some(b)) => a != b,
        _ => true,
    }
}

/// Path present remotely, absent locally
fn classify_remote_only(
    r: &FileEntry,
    rec: Option<&RecordEntry>,
    mode: SyncMode,
) -> Option<SyncAction> {
    if r.is_directory() {
        return match (rec, mode) {
            (Some(_), SyncMode::Bidirectional | SyncMode::Upload) => {
                Some(SyncAction::DeleteRemote(r.path.clone()))
            }
            _ => None,
        };
    }

    match rec {
        Some(rec) => match mode {
            // Download mode mirrors remote to local: restore the file.
            SyncMode::Download => Some(SyncAction::Download(r.path.clone())),
            SyncMode::Bidirectional => {
                if remote_changed(r, rec) {
                    // Edit beats delete.
                    Some(SyncAction::Download(r.path.clone()))
                } else {
                    Some(SyncAction::DeleteRemote(r.path.clone()))
                }
            }
            SyncMode::Upload => {
                if remote_changed(r, rec) {
                    debug!(path = %r.path,
                        "Remote change with local deletion in upload mode, leaving in place");
                    None
                } else {
                    Some(SyncAction::DeleteRemote(r.path.clone()))
                }
            }
        },
        None => mode
            .allows_download()
            .then(|| SyncAction::Download(r.path.clone())),
    }
}

/// Resolution when both sides changed (or both are new with differing content)
fn both_changed(l: &FileEntry, r: &FileEntry, mode: SyncMode, reason: ConflictReason) -> SyncAction {
    match mode {
        SyncMode::Upload => SyncAction::Upload(l.path.clone()),
        SyncMode::Download => SyncAction::Download(r.path.clone()),
        SyncMode::Bidirectional => {
            // Later mtime wins; an exact tie goes to remote.
            let winner = if l.modified > r.modified {
                Side::Local
            } else {
                Side::Remote
            };
            SyncAction::Conflict {
                path: l.path.clone(),
                winner,
                reason,
            }
        }
    }
}

/// Orders actions, synthesizes parent directories, suppresses directory
/// deletes that would not leave the directory empty
fn finalize(
    raw: Vec<SyncAction>,
    forget: Vec<RelPath>,
    local: &Snapshot,
    remote: &Snapshot,
) -> DiffOutcome {
    let mut mkdir_local: BTreeSet<RelPath> = BTreeSet::new();
    let mut mkdir_remote: BTreeSet<RelPath> = BTreeSet::new();

    let mut transfers: Vec<SyncAction> = Vec::new();
    let mut deletes: Vec<SyncAction> = Vec::new();

    for action in raw {
        match &action {
            SyncAction::Upload(path)
            | SyncAction::Conflict {
                path,
                winner: Side::Local,
                ..
            } => {
                for anc in path.ancestors() {
                    if !remote.contains(&anc) {
                        mkdir_remote.insert(anc);
                    }
                }
                transfers.push(action);
            }
            SyncAction::Download(path)
            | SyncAction::Conflict {
                path,
                winner: Side::Remote,
                ..
            } => {
                for anc in path.ancestors() {
                    if !local.contains(&anc) {
                        mkdir_local.insert(anc);
                    }
                }
                transfers.push(action);
            }
            SyncAction::DeleteLocal(_) | SyncAction::DeleteRemote(_) => deletes.push(action),
            SyncAction::CreateLocalDir(_) | SyncAction::CreateRemoteDir(_) => {
                // Never produced by classification; synthesized below.
                transfers.push(action);
            }
        }
    }

    // Keep a directory delete only if every snapshot child under it is
    // deleted by this same pass (otherwise the directory will not be empty).
    let deleted_local: HashSet<RelPath> = deletes
        .iter()
        .filter_map(|a| match a {
            SyncAction::DeleteLocal(p) => Some(p.clone()),
            _ => None,
        })
        .collect();
    let deleted_remote: HashSet<RelPath> = deletes
        .iter()
        .filter_map(|a| match a {
            SyncAction::DeleteRemote(p) => Some(p.clone()),
            _ => None,
        })
        .collect();

    deletes.retain(|action| match action {
        SyncAction::DeleteLocal(dir) if is_dir_in(local, dir) => local
            .paths()
            .filter(|p| *p != dir && p.starts_with(dir))
            .all(|p| deleted_local.contains(p)),
        SyncAction::DeleteRemote(dir) if is_dir_in(remote, dir) => remote
            .paths()
            .filter(|p| *p != dir && p.starts_with(dir))
            .all(|p| deleted_remote.contains(p)),
        _ => true,
    });

    transfers.sort_by(|a, b| a.path().cmp(b.path()));
    deletes.sort_by(|a, b| {
        b.path()
            .depth()
            .cmp(&a.path().depth())
            .then_with(|| b.path().cmp(a.path()))
    });

    let mut actions: Vec<SyncAction> =
        Vec::with_capacity(mkdir_local.len() + mkdir_remote.len() + transfers.len() + deletes.len());
    actions.extend(mkdir_local.into_iter().map(SyncAction::CreateLocalDir));
    actions.extend(mkdir_remote.into_iter().map(SyncAction::CreateRemoteDir));
    actions.extend(transfers);
    actions.extend(deletes);

    DiffOutcome { actions, forget }
}

fn is_dir_in(snapshot: &Snapshot, path: &RelPath) -> bool {
    snapshot.get(path).is_some_and(FileEntry::is_directory)
}

// ============================================================================
// Tests
// ============================================================================
