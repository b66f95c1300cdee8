//! Local state scanner
//!
//! Walks a local directory tree and produces a [`Snapshot`]: relative path,
//! kind, size and modification time per entry. Content fingerprints are
//! never computed here; the diff engine requests them lazily through the
//! [`Fingerprinter`](skydir_core::ports::Fingerprinter) port when size and
//! mtime alone cannot classify a change.
//!
//! Ignore patterns apply at both file and directory granularity: a matching
//! directory prunes its whole subtree without descending into it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use glob::Pattern;
use skydir_core::domain::entry::{FileEntry, Side, Snapshot};
use skydir_core::domain::newtypes::RelPath;
use tracing::{debug, warn};

use crate::EngineError;

/// Compiled set of ignore patterns for one scan
///
/// A pattern matches an entry when it matches either the full relative path
/// or the entry's final name (so `.git` excludes every `.git` directory at
/// any depth, and `photos/*.raw` excludes by location).
#[derive(Debug, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    /// Compile a pattern list; invalid patterns are skipped with a warning
    #[must_use]
    pub fn compile(patterns: &[String]) -> Self {
        let mut compiled = Vec::with_capacity(patterns.len());
        for raw in patterns {
            match Pattern::new(raw) {
                Ok(pattern) => compiled.push(pattern),
                Err(err) => {
                    warn!(pattern = %raw, error = %err, "Skipping invalid ignore pattern");
                }
            }
        }
        Self { patterns: compiled }
    }

    /// Whether the given relative path is excluded
    #[must_use]
    pub fn matches(&self, path: &RelPath) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches(path.as_str()) || p.matches(path.file_name()))
    }

    /// Number of compiled patterns
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no patterns are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Scans a local directory tree into a [`Snapshot`]
///
/// Fails with [`EngineError::Filesystem`] if `root` (or any reachable
/// subdirectory) is unreadable. Directory symlinks are not followed, to
/// avoid cycles; file symlinks are recorded with their target's metadata.
///
/// # Errors
/// Returns `EngineError::Filesystem` on any unreadable directory.
pub async fn scan(root: &Path, ignore: &IgnoreSet) -> Result<Snapshot, EngineError> {
    let mut snapshot = Snapshot::new(Side::Local);
    let mut stack: Vec<(PathBuf, Option<RelPath>)> = vec![(root.to_path_buf(), None)];

    while let Some((dir, rel)) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| EngineError::fs(&dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| EngineError::fs(&dir, e))?
        {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(name = ?raw, dir = %dir.display(), "Skipping non-UTF-8 entry name");
                    continue;
                }
            };

            let child_rel = match &rel {
                Some(parent) => parent.join(&name),
                None => RelPath::new(&name),
            };
            let child_rel = match child_rel {
                Ok(p) => p,
                Err(err) => {
                    warn!(name = %name, error = %err, "Skipping entry with invalid path");
                    continue;
                }
            };

            if ignore.matches(&child_rel) {
                debug!(path = %child_rel, "Ignored by pattern");
                continue;
            }

            let entry_path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| EngineError::fs(&entry_path, e))?;

            // Symlinks: never descend. A link to a file is recorded with the
            // target's metadata (content is read through on upload); a link
            // to a directory (or a broken link) is skipped.
            let metadata = if file_type.is_symlink() {
                match tokio::fs::metadata(&entry_path).await {
                    Ok(m) if m.is_file() => m,
                    Ok(_) => {
                        debug!(path = %child_rel, "Skipping directory symlink");
                        continue;
                    }
                    Err(err) => {
                        warn!(path = %child_rel, error = %err, "Skipping broken symlink");
                        continue;
                    }
                }
            } else {
                entry
                    .metadata()
                    .await
                    .map_err(|e| EngineError::fs(&entry_path, e))?
            };

            let modified = system_time_to_utc(&metadata, &entry_path);

            if metadata.is_dir() {
                snapshot.insert(FileEntry::directory(child_rel.clone(), modified));
                stack.push((entry_path, Some(child_rel)));
            } else {
                snapshot.insert(FileEntry::file(child_rel, metadata.len(), modified));
            }
        }
    }

    debug!(root = %root.display(), entries = snapshot.len(), "Local scan complete");
    Ok(snapshot)
}

fn system_time_to_utc(metadata: &std::fs::Metadata, path: &Path) -> DateTime<Utc> {
    match metadata.modified() {
        Ok(time) => time.into(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "No mtime available, using now");
            Utc::now()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use skydir_core::domain::entry::EntryKind;

    fn rel(s: &str) -> RelPath {
        RelPath::new(s).unwrap()
    }

    async fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_scan_records_files_and_directories() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.txt", "hello").await;
        write(tmp.path(), "docs/b.txt", "world").await;

        let snapshot = scan(tmp.path(), &IgnoreSet::default()).await.unwrap();

        assert_eq!(snapshot.len(), 3);
        let a = snapshot.get(&rel("a.txt")).unwrap();
        assert_eq!(a.kind, EntryKind::File);
        assert_eq!(a.size, 5);
        assert!(a.fingerprint.is_none(), "scan must not hash");
        assert_eq!(
            snapshot.get(&rel("docs")).unwrap().kind,
            EntryKind::Directory
        );
        assert!(snapshot.contains(&rel("docs/b.txt")));
    }

    #[tokio::test]
    async fn test_scan_fails_on_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        let result = scan(&missing, &IgnoreSet::default()).await;
        assert!(matches!(result, Err(EngineError::Filesystem { .. })));
    }

    #[tokio::test]
    async fn test_ignore_pattern_prunes_directory_subtree() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), ".git/objects/abc", "x").await;
        write(tmp.path(), "kept.txt", "x").await;

        let ignore = IgnoreSet::compile(&[".git".to_string()]);
        let snapshot = scan(tmp.path(), &ignore).await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains(&rel("kept.txt")));
    }

    #[tokio::test]
    async fn test_ignore_pattern_matches_by_name_at_depth() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "work/cache.tmp", "x").await;
        write(tmp.path(), "work/data.txt", "x").await;

        let ignore = IgnoreSet::compile(&["*.tmp".to_string()]);
        let snapshot = scan(tmp.path(), &ignore).await.unwrap();

        assert!(!snapshot.contains(&rel("work/cache.tmp")));
        assert!(snapshot.contains(&rel("work/data.txt")));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let ignore = IgnoreSet::compile(&["[".to_string(), "*.tmp".to_string()]);
        assert_eq!(ignore.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_directory_symlink_not_followed() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "real/file.txt", "x").await;
        std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("link")).unwrap();

        let snapshot = scan(tmp.path(), &IgnoreSet::default()).await.unwrap();

        assert!(snapshot.contains(&rel("real/file.txt")));
        assert!(!snapshot.contains(&rel("link")));
        assert!(!snapshot.contains(&rel("link/file.txt")));
    }
}
