//! In-memory port implementations
//!
//! [`InMemoryRemoteStore`] and [`InMemoryRecordStore`] back the engine's
//! tests: they behave like the real adapters (including idempotent delete
//! and mkdir) without network or database access, and support scripted
//! failure injection for retry and crash-recovery tests.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use skydir_core::domain::entry::EntryKind;
use skydir_core::domain::newtypes::{PairId, RelPath};
use skydir_core::domain::record::{ReconciliationRecord, RecordEntry};
use skydir_core::ports::record_store::RecordStore;
use skydir_core::ports::remote_store::{RemoteEntry, RemoteError, RemoteStore};

// ============================================================================
// InMemoryRemoteStore
// ============================================================================

#[derive(Debug, Clone)]
struct StoredObject {
    kind: EntryKind,
    data: Vec<u8>,
    modified: DateTime<Utc>,
}

/// Remote store backed by a path-keyed map
///
/// Paths are full remote paths as the engine would send them. Scripted
/// failures are consumed one per call, keyed by method name, before the
/// operation itself runs.
#[derive(Default)]
pub struct InMemoryRemoteStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failures: Mutex<Vec<(&'static str, RemoteError)>>,
    upload_calls: AtomicU32,
}

impl InMemoryRemoteStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a directory (and nothing else; parents are not implied)
    pub fn seed_dir(&self, path: &str) {
        self.objects.lock().unwrap().insert(
            path.to_string(),
            StoredObject {
                kind: EntryKind::Directory,
                data: Vec::new(),
                modified: Utc::now(),
            },
        );
    }

    /// Seed a file with explicit content and mtime
    pub fn seed_file(&self, path: &str, data: &[u8], modified: DateTime<Utc>) {
        self.objects.lock().unwrap().insert(
            path.to_string(),
            StoredObject {
                kind: EntryKind::File,
                data: data.to_vec(),
                modified,
            },
        );
    }

    /// Whether any object exists at the path
    #[must_use]
    pub fn exists(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }

    /// Content of a file, if present
    #[must_use]
    pub fn file_content(&self, path: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .filter(|o| o.kind == EntryKind::File)
            .map(|o| o.data.clone())
    }

    /// Queue a failure for the next call of `method`
    /// (`"list"`, `"stat"`, `"upload"`, `"download"`, `"delete"`, `"mkdir"`)
    pub fn queue_failure(&self, method: &'static str, error: RemoteError) {
        self.failures.lock().unwrap().push((method, error));
    }

    /// Number of upload attempts seen (including failed ones)
    #[must_use]
    pub fn upload_calls(&self) -> u32 {
        self.upload_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self, method: &'static str) -> Option<RemoteError> {
        let mut failures = self.failures.lock().unwrap();
        let idx = failures.iter().position(|(m, _)| *m == method)?;
        Some(failures.remove(idx).1)
    }

    fn entry_for(&self, path: &str, object: &StoredObject) -> RemoteEntry {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        let fingerprint = match object.kind {
            EntryKind::File => {
                let digest = Sha256::digest(&object.data);
                Some(digest.iter().map(|b| format!("{b:02x}")).collect())
            }
            EntryKind::Directory => None,
        };
        RemoteEntry {
            path: path.to_string(),
            name,
            kind: object.kind,
            size: object.data.len() as u64,
            modified: object.modified,
            fingerprint,
        }
    }
}

#[async_trait::async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        if let Some(err) = self.take_failure("list") {
            return Err(err);
        }
        let objects = self.objects.lock().unwrap();
        if !objects.contains_key(path) {
            return Err(RemoteError::Permanent(format!("no such directory: {path}")));
        }
        let prefix = format!("{}/", path.trim_end_matches('/'));
        Ok(objects
            .iter()
            .filter(|(p, _)| {
                p.starts_with(&prefix) && !p[prefix.len()..].contains('/')
            })
            .map(|(p, o)| self.entry_for(p, o))
            .collect())
    }

    async fn stat(&self, path: &str) -> Result<Option<RemoteEntry>, RemoteError> {
        if let Some(err) = self.take_failure("stat") {
            return Err(err);
        }
        let objects = self.objects.lock().unwrap();
        Ok(objects.get(path).map(|o| self.entry_for(path, o)))
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_failure("upload") {
            return Err(err);
        }
        let data = tokio::fs::read(local)
            .await
            .map_err(|e| RemoteError::Permanent(format!("cannot read {}: {e}", local.display())))?;
        self.objects.lock().unwrap().insert(
            remote.to_string(),
            StoredObject {
                kind: EntryKind::File,
                data,
                modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<(), RemoteError> {
        if let Some(err) = self.take_failure("download") {
            return Err(err);
        }
        let data = {
            let objects = self.objects.lock().unwrap();
            objects
                .get(remote)
                .filter(|o| o.kind == EntryKind::File)
                .map(|o| o.data.clone())
                .ok_or_else(|| RemoteError::Permanent(format!("no such file: {remote}")))?
        };
        tokio::fs::write(local, data)
            .await
            .map_err(|e| RemoteError::Permanent(format!("cannot write {}: {e}", local.display())))
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        if let Some(err) = self.take_failure("delete") {
            return Err(err);
        }
        let mut objects = self.objects.lock().unwrap();
        let prefix = format!("{}/", path.trim_end_matches('/'));
        objects.retain(|p, _| p != path && !p.starts_with(&prefix));
        Ok(())
    }

    async fn mkdir(&self, path: &str) -> Result<(), RemoteError> {
        if let Some(err) = self.take_failure("mkdir") {
            return Err(err);
        }
        let mut objects = self.objects.lock().unwrap();
        objects.entry(path.to_string()).or_insert(StoredObject {
            kind: EntryKind::Directory,
            data: Vec::new(),
            modified: Utc::now(),
        });
        Ok(())
    }
}

// ============================================================================
// InMemoryRecordStore
// ============================================================================

/// Record store backed by nested maps, atomic per entry by construction
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<PairId, HashMap<RelPath, RecordEntry>>>,
}

impl InMemoryRecordStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries recorded for a pair
    #[must_use]
    pub fn entry_count(&self, pair: &PairId) -> usize {
        self.records
            .lock()
            .unwrap()
            .get(pair)
            .map_or(0, HashMap::len)
    }

    /// Fetch one entry (test inspection)
    #[must_use]
    pub fn entry(&self, pair: &PairId, path: &RelPath) -> Option<RecordEntry> {
        self.records
            .lock()
            .unwrap()
            .get(pair)
            .and_then(|m| m.get(path).cloned())
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn load(&self, pair: &PairId) -> anyhow::Result<ReconciliationRecord> {
        let records = self.records.lock().unwrap();
        Ok(records
            .get(pair)
            .map(|m| ReconciliationRecord::from_entries(m.clone()))
            .unwrap_or_default())
    }

    async fn upsert(
        &self,
        pair: &PairId,
        path: &RelPath,
        entry: &RecordEntry,
    ) -> anyhow::Result<()> {
        self.records
            .lock()
            .unwrap()
            .entry(pair.clone())
            .or_default()
            .insert(path.clone(), entry.clone());
        Ok(())
    }

    async fn remove(&self, pair: &PairId, path: &RelPath) -> anyhow::Result<()> {
        if let Some(map) = self.records.lock().unwrap().get_mut(pair) {
            map.remove(path);
        }
        Ok(())
    }

    async fn last_synced(&self, pair: &PairId) -> anyhow::Result<Option<DateTime<Utc>>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .get(pair)
            .and_then(|m| m.values().map(|e| e.synced_at).max()))
    }
}

// ============================================================================
// Tests
// ============================================================================
