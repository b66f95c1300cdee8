//! Cloud disk API client
//!
//! Wraps `reqwest::Client` with authentication headers, JSON
//! deserialization and endpoint construction for a Yandex.Disk-style REST
//! API. Uploads and downloads are two-step: the API hands out a transfer
//! URL (`href`) which the actual bytes go through.
//!
//! Paths returned by the API may carry a `disk:` prefix; this module strips
//! it so callers only ever see plain `/`-separated paths.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::DiskError;

/// Default base URL of the cloud API
const DEFAULT_BASE_URL: &str = "https://cloud-api.yandex.net";

/// Page size for directory listings
const LIST_PAGE_LIMIT: u64 = 200;

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkBody {
    href: String,
}

#[derive(Debug, Deserialize)]
struct ResourceBody {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    modified: Option<DateTime<Utc>>,
    #[serde(default)]
    sha256: Option<String>,
    #[serde(rename = "_embedded", default)]
    embedded: Option<EmbeddedBody>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedBody {
    items: Vec<ResourceBody>,
    total: u64,
    #[allow(dead_code)]
    limit: u64,
    offset: u64,
}

#[derive(Debug, Deserialize)]
struct DiskInfoBody {
    total_space: u64,
    used_space: u64,
}

// ============================================================================
// Public data types
// ============================================================================

/// Metadata of one remote resource, paths normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    /// Full remote path without the `disk:` prefix
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// SHA-256 content hash (files only)
    pub sha256: Option<String>,
}

impl Resource {
    fn from_body(body: ResourceBody) -> Self {
        Self {
            name: body.name,
            path: normalize_path(&body.path),
            is_dir: body.kind == "dir",
            size: body.size.unwrap_or(0),
            modified: body.modified.unwrap_or_else(Utc::now),
            sha256: body.sha256,
        }
    }
}

/// Disk quota information (CLI `test` command)
#[derive(Debug, Clone, Copy)]
pub struct DiskInfo {
    pub total_space: u64,
    pub used_space: u64,
}

/// Strips the `disk:` prefix the API sometimes puts in front of paths
fn normalize_path(path: &str) -> String {
    path.strip_prefix("disk:").unwrap_or(path).to_string()
}

// ============================================================================
// DiskClient
// ============================================================================

/// HTTP client for the cloud disk REST API
///
/// Every request carries the `Authorization: OAuth <token>` header and the
/// configured timeout; a timeout surfaces as a transport error the provider
/// classifies as transient.
pub struct DiskClient {
    client: Client,
    base_url: String,
    token: String,
}

impl DiskClient {
    /// Creates a client for the production API endpoint
    ///
    /// # Errors
    /// Returns `DiskError::Http` if the underlying client cannot be built.
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self, DiskError> {
        Self::with_base_url(token, DEFAULT_BASE_URL, timeout)
    }

    /// Creates a client against a custom base URL (used by tests)
    ///
    /// # Errors
    /// Returns `DiskError::Http` if the underlying client cannot be built.
    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DiskError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    fn resources_url(&self, suffix: &str) -> String {
        format!("{}/v1/disk/resources{suffix}", self.base_url)
    }

    fn auth_header(&self) -> String {
        format!("OAuth {}", self.token)
    }

    /// Turns a non-success response into a `DiskError::Api`
    async fn expect_success(response: Response) -> Result<Response, DiskError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: ApiErrorBody = response.json().await.unwrap_or_default();
        Err(DiskError::Api {
            status: status.as_u16(),
            error: body.error.unwrap_or_default(),
            message: body
                .message
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string()),
        })
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    /// Fetches metadata for one path; `None` when it does not exist
    #[instrument(skip(self))]
    pub async fn stat(&self, path: &str) -> Result<Option<Resource>, DiskError> {
        let response = self
            .client
            .get(self.resources_url(""))
            .header("Authorization", self.auth_header())
            .query(&[("path", path), ("limit", "0")])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: ResourceBody = Self::expect_success(response).await?.json().await?;
        Ok(Some(Resource::from_body(body)))
    }

    /// Lists the immediate children of a directory, paging as needed
    #[instrument(skip(self))]
    pub async fn list(&self, path: &str) -> Result<Vec<Resource>, DiskError> {
        let mut items: Vec<Resource> = Vec::new();
        let mut offset: u64 = 0;
        let limit = LIST_PAGE_LIMIT.to_string();

        loop {
            let offset_param = offset.to_string();
            let response = self
                .client
                .get(self.resources_url(""))
                .header("Authorization", self.auth_header())
                .query(&[
                    ("path", path),
                    ("limit", limit.as_str()),
                    ("offset", offset_param.as_str()),
                ])
                .send()
                .await?;
            let body: ResourceBody = Self::expect_success(response).await?.json().await?;

            let Some(embedded) = body.embedded else {
                // A file path has no embedded listing.
                break;
            };

            let page_len = embedded.items.len() as u64;
            items.extend(embedded.items.into_iter().map(Resource::from_body));

            offset = embedded.offset + page_len;
            if page_len == 0 || offset >= embedded.total {
                break;
            }
        }

        debug!(path, count = items.len(), "Listed directory");
        Ok(items)
    }

    // ------------------------------------------------------------------
    // Transfers
    // ------------------------------------------------------------------

    /// Uploads a local file, replacing any existing remote content
    ///
    /// Two steps: request an upload link, then PUT the bytes to it.
    #[instrument(skip(self))]
    pub async fn upload(&self, local: &Path, remote: &str) -> Result<(), DiskError> {
        let response = self
            .client
            .get(self.resources_url("/upload"))
            .header("Authorization", self.auth_header())
            .query(&[("path", remote), ("overwrite", "true")])
            .send()
            .await?;
        let link: LinkBody = Self::expect_success(response).await?.json().await?;

        let data = tokio::fs::read(local).await?;
        let size = data.len();

        let response = self.client.put(&link.href).body(data).send().await?;
        Self::expect_success(response).await?;

        debug!(remote, bytes = size, "Upload complete");
        Ok(())
    }

    /// Downloads a remote file into a local path
    ///
    /// Two steps: request a download link, then GET the bytes from it.
    #[instrument(skip(self))]
    pub async fn download(&self, remote: &str, local: &Path) -> Result<(), DiskError> {
        let response = self
            .client
            .get(self.resources_url("/download"))
            .header("Authorization", self.auth_header())
            .query(&[("path", remote)])
            .send()
            .await?;
        let link: LinkBody = Self::expect_success(response).await?.json().await?;

        let response = self.client.get(&link.href).send().await?;
        let bytes = Self::expect_success(response).await?.bytes().await?;

        tokio::fs::write(local, &bytes).await?;
        debug!(remote, bytes = bytes.len(), "Download complete");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Creates a directory; the parent must already exist
    #[instrument(skip(self))]
    pub async fn mkdir(&self, path: &str) -> Result<(), DiskError> {
        let response = self
            .client
            .put(self.resources_url(""))
            .header("Authorization", self.auth_header())
            .query(&[("path", path)])
            .send()
            .await?;
        Self::expect_success(response).await?;
        debug!(path, "Directory created");
        Ok(())
    }

    /// Moves a file or directory to trash (not a permanent delete)
    #[instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> Result<(), DiskError> {
        let response = self
            .client
            .delete(self.resources_url(""))
            .header("Authorization", self.auth_header())
            .query(&[("path", path), ("permanently", "false")])
            .send()
            .await?;
        Self::expect_success(response).await?;
        debug!(path, "Moved to trash");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Fetches disk quota information (connection test)
    #[instrument(skip(self))]
    pub async fn disk_info(&self) -> Result<DiskInfo, DiskError> {
        let response = self
            .client
            .get(format!("{}/v1/disk/", self.base_url))
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        let body: DiskInfoBody = Self::expect_success(response).await?.json().await?;
        Ok(DiskInfo {
            total_space: body.total_space,
            used_space: body.used_space,
        })
    }
}
