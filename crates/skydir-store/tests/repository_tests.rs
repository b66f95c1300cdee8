//! Integration tests for the SQLite record store

use chrono::{TimeZone, Utc};
use skydir_core::domain::entry::EntryKind;
use skydir_core::domain::newtypes::{Fingerprint, PairId, RelPath};
use skydir_core::domain::record::RecordEntry;
use skydir_core::ports::record_store::RecordStore;
use skydir_store::{DatabasePool, SqliteRecordStore};

fn pair(s: &str) -> PairId {
    PairId::new(s).unwrap()
}

fn rel(s: &str) -> RelPath {
    RelPath::new(s).unwrap()
}

fn entry(size: u64, secs: i64) -> RecordEntry {
    RecordEntry {
        kind: EntryKind::File,
        size,
        modified: Utc.timestamp_opt(secs, 0).unwrap(),
        fingerprint: Some(Fingerprint::new("ab12").unwrap()),
        synced_at: Utc.timestamp_opt(secs + 1, 0).unwrap(),
    }
}

async fn store() -> SqliteRecordStore {
    let pool = DatabasePool::in_memory().await.unwrap();
    SqliteRecordStore::new(pool.pool().clone())
}

#[tokio::test]
async fn test_load_of_unknown_pair_is_empty() {
    let store = store().await;
    let record = store.load(&pair("docs")).await.unwrap();
    assert!(record.is_empty());
}

#[tokio::test]
async fn test_upsert_round_trips_all_fields() {
    let store = store().await;
    let original = entry(42, 1_700_000_000);

    store.upsert(&pair("docs"), &rel("a/b.txt"), &original).await.unwrap();

    let record = store.load(&pair("docs")).await.unwrap();
    assert_eq!(record.len(), 1);
    assert_eq!(record.get(&rel("a/b.txt")), Some(&original));
}

#[tokio::test]
async fn test_upsert_replaces_existing_entry() {
    let store = store().await;
    store.upsert(&pair("docs"), &rel("a.txt"), &entry(1, 100)).await.unwrap();
    store.upsert(&pair("docs"), &rel("a.txt"), &entry(2, 200)).await.unwrap();

    let record = store.load(&pair("docs")).await.unwrap();
    assert_eq!(record.len(), 1);
    assert_eq!(record.get(&rel("a.txt")).unwrap().size, 2);
}

#[tokio::test]
async fn test_directory_entry_without_fingerprint() {
    let store = store().await;
    let dir_entry = RecordEntry {
        kind: EntryKind::Directory,
        size: 0,
        modified: Utc.timestamp_opt(100, 0).unwrap(),
        fingerprint: None,
        synced_at: Utc.timestamp_opt(101, 0).unwrap(),
    };

    store.upsert(&pair("docs"), &rel("sub"), &dir_entry).await.unwrap();

    let record = store.load(&pair("docs")).await.unwrap();
    let loaded = record.get(&rel("sub")).unwrap();
    assert_eq!(loaded.kind, EntryKind::Directory);
    assert!(loaded.fingerprint.is_none());
}

#[tokio::test]
async fn test_pairs_are_isolated() {
    let store = store().await;
    store.upsert(&pair("docs"), &rel("a.txt"), &entry(1, 100)).await.unwrap();
    store.upsert(&pair("photos"), &rel("b.jpg"), &entry(2, 200)).await.unwrap();

    let docs = store.load(&pair("docs")).await.unwrap();
    let photos = store.load(&pair("photos")).await.unwrap();

    assert_eq!(docs.len(), 1);
    assert!(docs.contains(&rel("a.txt")));
    assert_eq!(photos.len(), 1);
    assert!(photos.contains(&rel("b.jpg")));
}

#[tokio::test]
async fn test_remove_is_idempotent() {
    let store = store().await;
    store.upsert(&pair("docs"), &rel("a.txt"), &entry(1, 100)).await.unwrap();

    store.remove(&pair("docs"), &rel("a.txt")).await.unwrap();
    store.remove(&pair("docs"), &rel("a.txt")).await.unwrap();

    assert!(store.load(&pair("docs")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_last_synced_reports_latest_timestamp() {
    let store = store().await;
    assert!(store.last_synced(&pair("docs")).await.unwrap().is_none());

    store.upsert(&pair("docs"), &rel("old.txt"), &entry(1, 100)).await.unwrap();
    store.upsert(&pair("docs"), &rel("new.txt"), &entry(1, 500)).await.unwrap();

    let latest = store.last_synced(&pair("docs")).await.unwrap().unwrap();
    assert_eq!(latest, Utc.timestamp_opt(501, 0).unwrap());
}
