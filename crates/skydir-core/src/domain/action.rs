//! Sync actions produced by the diff engine
//!
//! A reconciliation pass turns two snapshots plus the record into an ordered
//! list of [`SyncAction`]s. Actions are immutable once produced; the
//! executor consumes them in order and never invents new ones.

use serde::{Deserialize, Serialize};

use super::entry::Side;
use super::newtypes::RelPath;

/// Why a path was classified as conflicting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Both sides changed relative to the record since the last sync
    BothChanged,
    /// Both sides hold a path never seen before, with differing content
    BothNew,
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictReason::BothChanged => write!(f, "modified on both sides"),
            ConflictReason::BothNew => write!(f, "created on both sides"),
        }
    }
}

/// One operation needed to move a pair toward its target state
///
/// The `Conflict` variant carries the pre-resolved winner (later mtime wins,
/// exact tie goes to remote) so the executor can apply the rule without
/// re-reading either side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Transfer the local file to the remote side
    Upload(RelPath),
    /// Transfer the remote file to the local side
    Download(RelPath),
    /// Remove the local file or directory (remote deletion propagates)
    DeleteLocal(RelPath),
    /// Remove the remote file or directory (local deletion propagates)
    DeleteRemote(RelPath),
    /// Both sides changed; resolved deterministically toward `winner`
    Conflict {
        path: RelPath,
        winner: Side,
        reason: ConflictReason,
    },
    /// Create a local directory needed by a later Download
    CreateLocalDir(RelPath),
    /// Create a remote directory needed by a later Upload
    CreateRemoteDir(RelPath),
}

impl SyncAction {
    /// The path this action operates on
    #[must_use]
    pub fn path(&self) -> &RelPath {
        match self {
            SyncAction::Upload(p)
            | SyncAction::Download(p)
            | SyncAction::DeleteLocal(p)
            | SyncAction::DeleteRemote(p)
            | SyncAction::CreateLocalDir(p)
            | SyncAction::CreateRemoteDir(p) => p,
            SyncAction::Conflict { path, .. } => path,
        }
    }

    /// Short verb used in logs and reports
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            SyncAction::Upload(_) => "upload",
            SyncAction::Download(_) => "download",
            SyncAction::DeleteLocal(_) => "delete-local",
            SyncAction::DeleteRemote(_) => "delete-remote",
            SyncAction::Conflict { .. } => "conflict",
            SyncAction::CreateLocalDir(_) => "mkdir-local",
            SyncAction::CreateRemoteDir(_) => "mkdir-remote",
        }
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncAction::Conflict { path, winner, reason } => {
                write!(f, "conflict({path}: {reason}, {winner} wins)")
            }
            other => write!(f, "{}({})", other.verb(), other.path()),
        }
    }
}

/// Result of one diff: the ordered actions plus record retirements
///
/// `forget` lists paths that vanished from both sides and whose record
/// entries should be dropped at the end of the pass. They are not actions:
/// nothing is transferred or deleted for them.
#[derive(Debug, Clone, Default)]
pub struct DiffOutcome {
    /// Actions in execution order (mkdirs, transfers, deletes bottom-up)
    pub actions: Vec<SyncAction>,
    /// Record entries to retire (path gone on both sides)
    pub forget: Vec<RelPath>,
}

impl DiffOutcome {
    /// Whether the pass has nothing to do
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.forget.is_empty()
    }
}
