//! RemoteStore port implementation over the disk API client
//!
//! Maps [`DiskClient`] operations and failures into the port vocabulary the
//! engine understands. The classification here is what drives the
//! executor's retry behavior:
//!
//! | Failure                         | Classification |
//! |---------------------------------|----------------|
//! | transport error (timeout, ...)  | Transient      |
//! | HTTP 429, 5xx                   | Transient      |
//! | HTTP 401/403/404/409/...        | Permanent      |
//! | local I/O during a transfer     | Permanent      |
//!
//! Deleting a path that is already gone and creating a directory that
//! already exists are treated as success: the engine's actions describe a
//! target state, and in both cases the target state holds.

use std::path::Path;

use skydir_core::domain::entry::EntryKind;
use skydir_core::ports::remote_store::{RemoteEntry, RemoteError, RemoteStore};
use tracing::debug;

use crate::client::{DiskClient, Resource};
use crate::DiskError;

/// `RemoteStore` adapter over the cloud disk REST API
pub struct DiskRemoteStore {
    client: DiskClient,
}

impl DiskRemoteStore {
    /// Wraps a configured client
    pub fn new(client: DiskClient) -> Self {
        Self { client }
    }
}

/// Classifies an adapter failure for the engine's retry logic
fn classify(err: DiskError) -> RemoteError {
    match err {
        DiskError::Http(e) => RemoteError::Transient(e.to_string()),
        DiskError::Api { status, .. } if status == 429 || (500..=599).contains(&status) => {
            RemoteError::Transient(err.to_string())
        }
        DiskError::Api { .. } => RemoteError::Permanent(err.to_string()),
        DiskError::Io(e) => RemoteError::Permanent(e.to_string()),
    }
}

fn to_remote_entry(resource: Resource) -> RemoteEntry {
    RemoteEntry {
        name: resource.name,
        path: resource.path,
        kind: if resource.is_dir {
            EntryKind::Directory
        } else {
            EntryKind::File
        },
        size: resource.size,
        modified: resource.modified,
        fingerprint: resource.sha256,
    }
}

#[async_trait::async_trait]
impl RemoteStore for DiskRemoteStore {
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        self.client
            .list(path)
            .await
            .map(|resources| resources.into_iter().map(to_remote_entry).collect())
            .map_err(classify)
    }

    async fn stat(&self, path: &str) -> Result<Option<RemoteEntry>, RemoteError> {
        self.client
            .stat(path)
            .await
            .map(|resource| resource.map(to_remote_entry))
            .map_err(classify)
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        self.client.upload(local, remote).await.map_err(classify)
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<(), RemoteError> {
        self.client.download(remote, local).await.map_err(classify)
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        match self.client.delete(path).await {
            Ok(()) => Ok(()),
            // Already gone: the desired state holds.
            Err(DiskError::Api { status: 404, .. }) => {
                debug!(path, "Delete of a missing path treated as success");
                Ok(())
            }
            Err(err) => Err(classify(err)),
        }
    }

    async fn mkdir(&self, path: &str) -> Result<(), RemoteError> {
        match self.client.mkdir(path).await {
            Ok(()) => Ok(()),
            // 409 with the "already exists" error name: the directory is there.
            Err(DiskError::Api {
                status: 409,
                ref error,
                ..
            }) if error.contains("ExistentDirectory") => {
                debug!(path, "mkdir of an existing directory treated as success");
                Ok(())
            }
            Err(err) => Err(classify(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        let transient = classify(DiskError::Api {
            status: 429,
            error: String::new(),
            message: "slow down".into(),
        });
        assert!(transient.is_transient());

        let transient = classify(DiskError::Api {
            status: 503,
            error: String::new(),
            message: "unavailable".into(),
        });
        assert!(transient.is_transient());

        let permanent = classify(DiskError::Api {
            status: 401,
            error: "UnauthorizedError".into(),
            message: "bad token".into(),
        });
        assert!(!permanent.is_transient());

        let permanent = classify(DiskError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        )));
        assert!(!permanent.is_transient());
    }
}
