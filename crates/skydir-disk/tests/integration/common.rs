//! Shared test setup

use std::time::Duration;

use skydir_disk::{DiskClient, DiskRemoteStore};
use wiremock::MockServer;

/// Client pointed at a fresh mock server
pub async fn setup() -> (MockServer, DiskClient) {
    let server = MockServer::start().await;
    let client = DiskClient::with_base_url("test-token", server.uri(), Duration::from_secs(5))
        .expect("client builds");
    (server, client)
}

/// Provider (port adapter) pointed at a fresh mock server
pub async fn setup_provider() -> (MockServer, DiskRemoteStore) {
    let (server, client) = setup().await;
    (server, DiskRemoteStore::new(client))
}
