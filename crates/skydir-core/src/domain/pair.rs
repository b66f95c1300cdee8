//! Directory-pair configuration as seen by the engine
//!
//! A [`PairConfig`] is derived from the configuration file at startup and is
//! read-only to the core: the engine never mutates pair definitions.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::PairId;

/// Synchronization policy for a directory pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Local changes propagate to remote; nothing is ever written locally
    Upload,
    /// Remote changes propagate to local; nothing is ever written remotely
    Download,
    /// Changes propagate both ways, conflicts resolved deterministically
    Bidirectional,
}

impl SyncMode {
    /// Whether this mode may produce Upload / DeleteRemote / CreateRemoteDir
    #[must_use]
    pub fn allows_upload(&self) -> bool {
        matches!(self, SyncMode::Upload | SyncMode::Bidirectional)
    }

    /// Whether this mode may produce Download / DeleteLocal / CreateLocalDir
    #[must_use]
    pub fn allows_download(&self) -> bool {
        matches!(self, SyncMode::Download | SyncMode::Bidirectional)
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Upload => write!(f, "upload"),
            SyncMode::Download => write!(f, "download"),
            SyncMode::Bidirectional => write!(f, "bidirectional"),
        }
    }
}

impl FromStr for SyncMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(SyncMode::Upload),
            "download" => Ok(SyncMode::Download),
            "bidirectional" => Ok(SyncMode::Bidirectional),
            other => Err(DomainError::InvalidSyncMode(other.to_string())),
        }
    }
}

/// One local-root/remote-root mapping with an assigned sync mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairConfig {
    /// Unique identifier (the `name` from configuration)
    pub id: PairId,
    /// Absolute local root of the pair
    pub local_root: PathBuf,
    /// Absolute remote root of the pair (slash-separated)
    pub remote_root: String,
    /// Synchronization policy
    pub mode: SyncMode,
    /// Glob patterns excluded from scanning and syncing
    pub ignore: Vec<String>,
}
