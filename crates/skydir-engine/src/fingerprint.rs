//! Content fingerprinting
//!
//! [`Sha256Fingerprinter`] hashes file contents in chunks; it is the default
//! implementation of the [`Fingerprinter`] port. [`CachedFingerprinter`]
//! wraps any implementation with a cache keyed by path + mtime + size, so a
//! file that has not changed on disk is never rehashed across passes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Context;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use skydir_core::domain::newtypes::Fingerprint;
use skydir_core::ports::Fingerprinter;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Read buffer size for hashing
const CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 implementation of the fingerprint port
#[derive(Debug, Clone, Default)]
pub struct Sha256Fingerprinter;

impl Sha256Fingerprinter {
    /// Create a new `Sha256Fingerprinter`
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Fingerprinter for Sha256Fingerprinter {
    async fn compute(&self, path: &Path) -> anyhow::Result<Fingerprint> {
        let mut file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {} for hashing", path.display()))?;

        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = file
                .read(&mut buf)
                .await
                .with_context(|| format!("Failed to read {} for hashing", path.display()))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Fingerprint::new(hex).map_err(Into::into)
    }
}

/// Cache slot: the metadata the fingerprint was computed under
#[derive(Debug, Clone)]
struct CachedDigest {
    mtime: SystemTime,
    size: u64,
    fingerprint: Fingerprint,
}

/// Caching wrapper around any [`Fingerprinter`]
///
/// The cache key is the absolute path; an entry is valid only while the
/// file's mtime and size both match what they were at computation time.
/// Stale entries are replaced in place, so the map never grows beyond one
/// entry per live path.
pub struct CachedFingerprinter {
    inner: Arc<dyn Fingerprinter>,
    cache: DashMap<PathBuf, CachedDigest>,
}

impl CachedFingerprinter {
    /// Wrap `inner` with an mtime+size keyed cache
    pub fn new(inner: Arc<dyn Fingerprinter>) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Number of cached digests (test/diagnostic aid)
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait::async_trait]
impl Fingerprinter for CachedFingerprinter {
    async fn compute(&self, path: &Path) -> anyhow::Result<Fingerprint> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat {} for hashing", path.display()))?;
        let mtime = metadata
            .modified()
            .with_context(|| format!("No mtime for {}", path.display()))?;
        let size = metadata.len();

        if let Some(slot) = self.cache.get(path) {
            if slot.mtime == mtime && slot.size == size {
                debug!(path = %path.display(), "Fingerprint cache hit");
                return Ok(slot.fingerprint.clone());
            }
        }

        let fingerprint = self.inner.compute(path).await?;
        self.cache.insert(
            path.to_path_buf(),
            CachedDigest {
                mtime,
                size,
                fingerprint: fingerprint.clone(),
            },
        );
        Ok(fingerprint)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256 of the ASCII string "hello"
    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[tokio::test]
    async fn test_sha256_known_digest() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hello.txt");
        tokio::fs::write(&path, "hello").await.unwrap();

        let fp = Sha256Fingerprinter::new().compute(&path).await.unwrap();
        assert_eq!(fp.as_str(), HELLO_SHA256);
    }

    #[tokio::test]
    async fn test_sha256_missing_file_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let result = Sha256Fingerprinter::new()
            .compute(&tmp.path().join("absent"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cache_returns_same_digest_without_rehash() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.txt");
        tokio::fs::write(&path, "hello").await.unwrap();

        let cached = CachedFingerprinter::new(Arc::new(Sha256Fingerprinter::new()));
        let first = cached.compute(&path).await.unwrap();
        let second = cached.compute(&path).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.cached_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_invalidated_on_content_change() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.txt");
        tokio::fs::write(&path, "hello").await.unwrap();

        let cached = CachedFingerprinter::new(Arc::new(Sha256Fingerprinter::new()));
        let first = cached.compute(&path).await.unwrap();

        // Different length guarantees the size component of the key changes
        // even when the filesystem's mtime granularity is coarse.
        tokio::fs::write(&path, "hello, world").await.unwrap();
        let second = cached.compute(&path).await.unwrap();

        assert_ne!(first, second);
    }
}
