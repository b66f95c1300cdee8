//! SkyDir Engine - the synchronization reconciliation core
//!
//! Given a local directory tree and a remote folder, this crate computes the
//! minimal set of transfer/delete operations that brings a directory pair
//! into its policy-defined target state, and executes them safely under
//! concurrent triggers.
//!
//! ## Modules
//!
//! - [`scanner`] - local tree walk producing a [`Snapshot`](skydir_core::domain::Snapshot)
//! - [`remote_walk`] - remote tree walk through the `RemoteStore` port
//! - [`fingerprint`] - SHA-256 fingerprinting with an mtime+size cache
//! - [`diff`] - three-way diff (local, remote, record) producing actions
//! - [`executor`] - applies actions with retry, backoff and crash-safe
//!   record updates
//! - [`watcher`] / [`debounce`] - filesystem events coalesced into per-pair
//!   triggers
//! - [`coordinator`] - per-pair state machines serializing reconciliation
//!   passes
//! - [`memory`] - in-memory port implementations (test doubles)

pub mod coordinator;
pub mod debounce;
pub mod diff;
pub mod executor;
pub mod fingerprint;
pub mod memory;
pub mod remote_walk;
pub mod scanner;
pub mod watcher;

use std::path::PathBuf;

use skydir_core::domain::newtypes::PairId;
use skydir_core::ports::remote_store::RemoteError;
use thiserror::Error;

/// Errors that abort a reconciliation pass (or refuse to start one)
///
/// Per-action failures never surface here; they are collected in the
/// [`PassReport`](executor::PassReport). An `EngineError` means the pass as
/// a whole could not run: a snapshot was unobtainable, or the pair was
/// unknown or busy.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A local filesystem error prevented scanning or preparing the pair
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote snapshot could not be obtained
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// The record store failed while loading the pair's record
    #[error("record store error: {0}")]
    Store(#[from] anyhow::Error),

    /// A one-shot reconciliation was requested while a pass is running
    #[error("pair '{0}' is already reconciling")]
    Busy(PairId),

    /// The pair id is not configured
    #[error("unknown pair: {0}")]
    UnknownPair(PairId),
}

impl EngineError {
    /// Helper for wrapping an I/O error with the path it occurred at
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
