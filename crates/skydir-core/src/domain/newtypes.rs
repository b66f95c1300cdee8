//! Validated value types
//!
//! Newtype wrappers that make invalid values unrepresentable:
//! relative paths, content fingerprints, and directory-pair identifiers.
//! All of them validate in `new()` and are immutable afterwards.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// RelPath
// ============================================================================

/// A validated slash-separated relative path within a directory pair
///
/// `RelPath` is the common currency between the local tree, the remote tree
/// and the reconciliation record: the same relative path identifies the same
/// logical object on all three. It is guaranteed to be:
/// - non-empty
/// - relative (no leading `/`)
/// - normalized (no empty, `.` or `..` segments, no trailing slash)
/// - free of backslashes (remote paths are always `/`-separated)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelPath(String);

impl RelPath {
    /// Create a new RelPath, validating the invariants above
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` when the string is empty, absolute,
    /// contains backslashes, or has empty/`.`/`..` segments
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();

        if path.is_empty() {
            return Err(DomainError::InvalidPath("empty path".to_string()));
        }
        if path.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "path must be relative: {path}"
            )));
        }
        if path.contains('\\') {
            return Err(DomainError::InvalidPath(format!(
                "path must be slash-separated: {path}"
            )));
        }

        let path = path.strip_suffix('/').unwrap_or(&path).to_string();

        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(DomainError::InvalidPath(format!(
                    "invalid segment in path: {path}"
                )));
            }
        }

        Ok(Self(path))
    }

    /// The path as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of path segments
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.split('/').count()
    }

    /// Final path segment (file or directory name)
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Parent path, or `None` for a top-level entry
    #[must_use]
    pub fn parent(&self) -> Option<RelPath> {
        self.0.rsplit_once('/').map(|(parent, _)| Self(parent.to_string()))
    }

    /// All proper ancestors, nearest the root first
    ///
    /// `a/b/c.txt` yields `a`, then `a/b`.
    pub fn ancestors(&self) -> impl Iterator<Item = RelPath> + '_ {
        let segments: Vec<&str> = self.0.split('/').collect();
        (1..segments.len()).map(move |n| Self(segments[..n].join("/")))
    }

    /// Append a single segment
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` if the segment is not a valid
    /// single path component
    pub fn join(&self, segment: &str) -> Result<RelPath, DomainError> {
        Self::new(format!("{}/{}", self.0, segment))
    }

    /// Whether `self` equals `prefix` or lies beneath it
    #[must_use]
    pub fn starts_with(&self, prefix: &RelPath) -> bool {
        self.0 == prefix.0 || self.0.starts_with(&format!("{}/", prefix.0))
    }

    /// Absolute local path for this entry under `root`
    #[must_use]
    pub fn to_local(&self, root: &std::path::Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for segment in self.0.split('/') {
            out.push(segment);
        }
        out
    }

    /// Absolute remote path for this entry under `root`
    #[must_use]
    pub fn to_remote(&self, root: &str) -> String {
        format!("{}/{}", root.trim_end_matches('/'), self.0)
    }
}

impl Display for RelPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RelPath {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RelPath> for String {
    fn from(path: RelPath) -> Self {
        path.0
    }
}

impl FromStr for RelPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// Fingerprint
// ============================================================================

/// A content fingerprint: lowercase hex digest of a file's bytes
///
/// The digest algorithm is an implementation detail of the
/// `Fingerprinter` port (SHA-256 locally; whatever the remote API
/// reports for remote entries). Comparison is plain string equality,
/// so both sides must agree on the algorithm for a given deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Create a new Fingerprint from a hex digest string
    ///
    /// Uppercase input is folded to lowercase.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidFingerprint` when the string is empty
    /// or contains non-hex characters
    pub fn new(digest: impl Into<String>) -> Result<Self, DomainError> {
        let digest = digest.into().to_lowercase();

        if digest.is_empty() {
            return Err(DomainError::InvalidFingerprint("empty digest".to_string()));
        }
        if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidFingerprint(digest));
        }

        Ok(Self(digest))
    }

    /// The digest as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

// ============================================================================
// PairId
// ============================================================================

/// Identifier of a configured directory pair
///
/// Taken from the `name` field of a pair in the configuration file;
/// also used as the persistence key in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PairId(String);

impl PairId {
    /// Create a new PairId
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPairId` when the name is empty or
    /// contains characters outside `[A-Za-z0-9._-]`
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();

        if name.is_empty() {
            return Err(DomainError::InvalidPairId("empty name".to_string()));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(DomainError::InvalidPairId(name));
        }

        Ok(Self(name))
    }

    /// The identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PairId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PairId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PairId> for String {
    fn from(id: PairId) -> Self {
        id.0
    }
}

impl FromStr for PairId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// Tests
// ============================================================================
