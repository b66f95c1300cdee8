//! Domain error types
//!
//! Validation failures for the value types in this crate. Adapter- and
//! engine-level failures have their own error enums in their own crates.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid relative path format or content
    #[error("Invalid relative path: {0}")]
    InvalidPath(String),

    /// Invalid fingerprint format (expected lowercase hex digest)
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Invalid directory-pair identifier
    #[error("Invalid pair id: {0}")]
    InvalidPairId(String),

    /// Invalid synchronization mode name
    #[error("Invalid sync mode: {0}")]
    InvalidSyncMode(String),

    /// Generic configuration validation failure
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
