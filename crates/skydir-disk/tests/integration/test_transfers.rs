//! Two-step upload/download flows and disk info

use serde_json::json;
use wiremock::matchers::{body_bytes, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::setup;

#[tokio::test]
async fn test_upload_requests_link_then_puts_bytes() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources/upload"))
        .and(query_param("path", "/SkyDir/docs/a.txt"))
        .and(query_param("overwrite", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "href": format!("{}/upload-target", server.uri()),
            "method": "PUT",
            "templated": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload-target"))
        .and(body_bytes(b"hello".to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let local = tmp.path().join("a.txt");
    tokio::fs::write(&local, "hello").await.unwrap();

    client.upload(&local, "/SkyDir/docs/a.txt").await.unwrap();
}

#[tokio::test]
async fn test_upload_of_missing_local_file_fails() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "href": format!("{}/upload-target", server.uri())
        })))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("absent.txt");
    assert!(client.upload(&missing, "/SkyDir/x.txt").await.is_err());
}

#[tokio::test]
async fn test_download_requests_link_then_fetches_bytes() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources/download"))
        .and(query_param("path", "/SkyDir/docs/a.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "href": format!("{}/download-target", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/download-target"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"remote bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let local = tmp.path().join("a.txt");
    client.download("/SkyDir/docs/a.txt", &local).await.unwrap();

    let content = tokio::fs::read(&local).await.unwrap();
    assert_eq!(content, b"remote bytes");
}

#[tokio::test]
async fn test_disk_info_parses_quota() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_space": 10_737_418_240u64,
            "used_space": 1_073_741_824u64
        })))
        .mount(&server)
        .await;

    let info = client.disk_info().await.unwrap();
    assert_eq!(info.total_space, 10_737_418_240);
    assert_eq!(info.used_space, 1_073_741_824);
}
