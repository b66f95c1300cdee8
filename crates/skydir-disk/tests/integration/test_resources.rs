//! Metadata, listing, mkdir and delete behavior

use serde_json::json;
use skydir_core::domain::entry::EntryKind;
use skydir_core::ports::remote_store::RemoteStore;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{setup, setup_provider};

#[tokio::test]
async fn test_stat_maps_resource_fields() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/SkyDir/docs/a.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "a.txt",
            "path": "disk:/SkyDir/docs/a.txt",
            "type": "file",
            "size": 5,
            "modified": "2026-03-01T12:00:00+00:00",
            "sha256": "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        })))
        .mount(&server)
        .await;

    let resource = client.stat("/SkyDir/docs/a.txt").await.unwrap().unwrap();
    assert_eq!(resource.name, "a.txt");
    assert_eq!(resource.path, "/SkyDir/docs/a.txt", "disk: prefix stripped");
    assert!(!resource.is_dir);
    assert_eq!(resource.size, 5);
    assert!(resource.sha256.is_some());
}

#[tokio::test]
async fn test_stat_missing_path_is_none() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "DiskNotFoundError",
            "message": "Resource not found."
        })))
        .mount(&server)
        .await;

    assert!(client.stat("/SkyDir/missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_pages_through_embedded_items() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "docs",
            "path": "disk:/SkyDir/docs",
            "type": "dir",
            "_embedded": {
                "items": [
                    {"name": "a.txt", "path": "disk:/SkyDir/docs/a.txt", "type": "file",
                     "size": 3, "modified": "2026-03-01T12:00:00+00:00", "sha256": "aa"},
                    {"name": "sub", "path": "disk:/SkyDir/docs/sub", "type": "dir",
                     "modified": "2026-03-01T12:00:00+00:00"}
                ],
                "total": 3,
                "limit": 200,
                "offset": 0
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "docs",
            "path": "disk:/SkyDir/docs",
            "type": "dir",
            "_embedded": {
                "items": [
                    {"name": "z.txt", "path": "disk:/SkyDir/docs/z.txt", "type": "file",
                     "size": 9, "modified": "2026-03-01T12:00:00+00:00", "sha256": "zz"}
                ],
                "total": 3,
                "limit": 200,
                "offset": 2
            }
        })))
        .mount(&server)
        .await;

    let items = client.list("/SkyDir/docs").await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].name, "a.txt");
    assert!(items[1].is_dir);
    assert_eq!(items[2].name, "z.txt");
}

#[tokio::test]
async fn test_provider_maps_listing_to_remote_entries() {
    let (server, provider) = setup_provider().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "docs",
            "path": "disk:/SkyDir/docs",
            "type": "dir",
            "_embedded": {
                "items": [
                    {"name": "a.txt", "path": "disk:/SkyDir/docs/a.txt", "type": "file",
                     "size": 3, "modified": "2026-03-01T12:00:00+00:00", "sha256": "aa"}
                ],
                "total": 1,
                "limit": 200,
                "offset": 0
            }
        })))
        .mount(&server)
        .await;

    let entries = provider.list("/SkyDir/docs").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::File);
    assert_eq!(entries[0].fingerprint.as_deref(), Some("aa"));
}

#[tokio::test]
async fn test_mkdir_existing_directory_is_success() {
    let (server, provider) = setup_provider().await;

    Mock::given(method("PUT"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": "DiskPathPointsToExistentDirectoryError",
            "message": "Specified path already exists."
        })))
        .mount(&server)
        .await;

    provider.mkdir("/SkyDir/docs").await.unwrap();
}

#[tokio::test]
async fn test_mkdir_missing_parent_is_permanent() {
    let (server, provider) = setup_provider().await;

    Mock::given(method("PUT"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": "DiskPathDoesntExistsError",
            "message": "Specified path doesn't exist."
        })))
        .mount(&server)
        .await;

    let err = provider.mkdir("/SkyDir/a/b").await.unwrap_err();
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_delete_missing_path_is_success() {
    let (server, provider) = setup_provider().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "DiskNotFoundError",
            "message": "Resource not found."
        })))
        .mount(&server)
        .await;

    provider.delete("/SkyDir/gone.txt").await.unwrap();
}

#[tokio::test]
async fn test_delete_sends_trash_not_permanent() {
    let (server, provider) = setup_provider().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/disk/resources"))
        .and(query_param("permanently", "false"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    provider.delete("/SkyDir/old.txt").await.unwrap();
}

#[tokio::test]
async fn test_rate_limit_is_transient() {
    let (server, provider) = setup_provider().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": "TooManyRequestsError",
            "message": "Too many requests."
        })))
        .mount(&server)
        .await;

    let err = provider.stat("/SkyDir").await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_auth_failure_is_permanent() {
    let (server, provider) = setup_provider().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "UnauthorizedError",
            "message": "Unauthorized."
        })))
        .mount(&server)
        .await;

    let err = provider.list("/SkyDir").await.unwrap_err();
    assert!(!err.is_transient());
}
