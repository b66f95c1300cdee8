//! SkyDir Disk - remote storage adapter
//!
//! Typed HTTP client for a Yandex.Disk-style cloud REST API and the
//! [`RemoteStore`](skydir_core::ports::RemoteStore) implementation on top
//! of it.
//!
//! - [`client`] - raw API operations (`DiskClient`): resource metadata,
//!   two-step upload/download, mkdir, trash delete, disk info
//! - [`provider`] - the port adapter (`DiskRemoteStore`) with the
//!   transient/permanent error classification the engine retries on

pub mod client;
pub mod provider;

pub use client::{DiskClient, DiskInfo, Resource};
pub use provider::DiskRemoteStore;

use thiserror::Error;

/// Errors raised by the disk adapter before port-level classification
#[derive(Debug, Error)]
pub enum DiskError {
    /// Transport-level failure (connect, timeout, TLS, body read)
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Machine-readable error name from the response body, if any
        error: String,
        /// Human-readable message from the response body
        message: String,
    },

    /// Local file I/O failed while staging a transfer
    #[error("Local I/O error: {0}")]
    Io(#[from] std::io::Error),
}
