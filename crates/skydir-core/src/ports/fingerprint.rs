//! Content fingerprinting port
//!
//! Hashing is modeled as a pluggable capability so the cost/correctness
//! tradeoff (mtime+size heuristic vs. full content hash) can be swapped
//! without touching the diff engine.

use std::path::Path;

use crate::domain::newtypes::Fingerprint;

/// Port trait for computing a file's content fingerprint
#[async_trait::async_trait]
pub trait Fingerprinter: Send + Sync {
    /// Computes the fingerprint of the file at `path`
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    async fn compute(&self, path: &Path) -> anyhow::Result<Fingerprint>;
}
