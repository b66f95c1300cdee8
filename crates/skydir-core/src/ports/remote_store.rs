//! Remote storage accessor port (driven/secondary port)
//!
//! Thin polling interface over the remote storage API. The concrete
//! transport lives in an adapter crate; the engine only sees this trait.
//!
//! ## Design Notes
//!
//! - Every operation fails with a [`RemoteError`] that is either
//!   `Transient` (worth retrying with backoff) or `Permanent` (fatal for
//!   the specific action). The classification is the adapter's job; the
//!   executor only dispatches on the two kinds.
//! - `RemoteEntry` is a port-level DTO, not a domain entity. The remote
//!   walker maps it into `FileEntry` values.
//! - Paths handed to this trait are full remote paths (pair remote root
//!   already joined), slash-separated.

use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::entry::EntryKind;

/// Failure of a remote operation, classified for retry handling
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Worth retrying: network timeout, rate limit, server error
    #[error("transient remote error: {0}")]
    Transient(String),

    /// Not worth retrying: authentication failure, missing path, bad request
    #[error("permanent remote error: {0}")]
    Permanent(String),
}

impl RemoteError {
    /// Whether the executor should retry this failure with backoff
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Transient(_))
    }
}

/// Metadata for one object on the remote side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Full remote path of the object
    pub path: String,
    /// Object name (final path segment)
    pub name: String,
    /// File or directory
    pub kind: EntryKind,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Last modification timestamp as reported by the backend
    pub modified: DateTime<Utc>,
    /// Content hash as reported by the backend (files only, hex)
    pub fingerprint: Option<String>,
}

/// Port trait for cloud storage operations
///
/// All methods are async and may suspend on network I/O; implementations
/// must bound each call with a timeout and map a timeout to
/// [`RemoteError::Transient`].
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Lists the immediate children of a remote directory
    ///
    /// # Errors
    /// `Permanent` if the directory does not exist; `Transient` on network
    /// or server failures.
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// Fetches metadata for a single remote path
    ///
    /// Returns `Ok(None)` when the path does not exist (a missing path is
    /// an answer here, not an error).
    async fn stat(&self, path: &str) -> Result<Option<RemoteEntry>, RemoteError>;

    /// Uploads a local file to the given remote path, replacing any
    /// existing content
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), RemoteError>;

    /// Downloads a remote file into the given local path
    ///
    /// The destination's parent directory must already exist; the adapter
    /// writes the file but does not create directories.
    async fn download(&self, remote: &str, local: &Path) -> Result<(), RemoteError>;

    /// Deletes a remote file or directory (recursively, into trash when the
    /// backend supports it)
    async fn delete(&self, path: &str) -> Result<(), RemoteError>;

    /// Creates a remote directory; the parent must already exist
    async fn mkdir(&self, path: &str) -> Result<(), RemoteError>;
}
