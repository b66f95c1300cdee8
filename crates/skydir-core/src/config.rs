//! Configuration module for SkyDir.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, defaults, and conversion into the
//! engine-facing [`PairConfig`](crate::domain::PairConfig) list.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::newtypes::PairId;
use crate::domain::pair::{PairConfig, SyncMode};

/// Placeholder the sample config ships with; `validate` rejects it.
const TOKEN_PLACEHOLDER: &str = "your_oauth_token_here";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for SkyDir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OAuth token for the cloud backend. Acquisition is out of scope here;
    /// the user provisions it (see the sample config for pointers).
    pub token: String,
    /// Root folder on the remote side where all pairs live.
    pub remote_root: String,
    /// Local root directory all pair paths are relative to.
    pub local_root: PathBuf,
    /// Configured directory pairs.
    #[serde(default)]
    pub pairs: Vec<PairEntry>,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// One directory pair as written in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairEntry {
    /// Unique pair name, also the persistence key.
    pub name: String,
    /// Path below `local_root`.
    pub local_path: String,
    /// Path below `remote_root`.
    pub remote_path: String,
    /// Sync policy; defaults to bidirectional like the sample config.
    #[serde(default = "default_mode")]
    pub mode: SyncMode,
    /// Glob patterns excluded from scanning and syncing.
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// Daemon scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds between periodic reconciliation passes per pair.
    pub sync_interval: u64,
    /// Whether to react to filesystem change events.
    pub watch: bool,
    /// Seconds a pair must stay quiet after a change before a pass starts.
    pub debounce_delay: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Optional log file; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Remote API transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the cloud REST API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

fn default_mode() -> SyncMode {
    SyncMode::Bidirectional
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            sync_interval: 300,
            watch: true,
            debounce_delay: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://cloud-api.yandex.net".to_string(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/skydir/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("skydir")
            .join("config.yaml")
    }

    /// Validate the configuration before any component is built from it.
    ///
    /// # Errors
    /// Returns `DomainError::ConfigError` describing the first problem found.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.token.is_empty() || self.token == TOKEN_PLACEHOLDER {
            return Err(DomainError::ConfigError(
                "token is not set; provision an OAuth token first".to_string(),
            ));
        }
        if self.remote_root.is_empty() || !self.remote_root.starts_with('/') {
            return Err(DomainError::ConfigError(format!(
                "remote_root must be an absolute remote path: {:?}",
                self.remote_root
            )));
        }
        if !self.local_root.is_absolute() {
            return Err(DomainError::ConfigError(format!(
                "local_root must be absolute: {}",
                self.local_root.display()
            )));
        }
        if self.pairs.is_empty() {
            return Err(DomainError::ConfigError(
                "at least one directory pair must be configured".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for pair in &self.pairs {
            PairId::new(&pair.name)?;
            if !seen.insert(pair.name.as_str()) {
                return Err(DomainError::ConfigError(format!(
                    "duplicate pair name: {}",
                    pair.name
                )));
            }
            if pair.local_path.is_empty() || pair.remote_path.is_empty() {
                return Err(DomainError::ConfigError(format!(
                    "pair '{}' has an empty local_path or remote_path",
                    pair.name
                )));
            }
        }

        if self.daemon.sync_interval < 60 {
            tracing::warn!(
                interval_secs = self.daemon.sync_interval,
                "sync interval is very short (< 60 seconds)"
            );
        }

        Ok(())
    }

    /// Resolve the configured pairs into engine-facing [`PairConfig`]s.
    ///
    /// # Errors
    /// Returns `DomainError` if a pair name is invalid. Call
    /// [`validate`](Config::validate) first for full checking.
    pub fn pair_configs(&self) -> Result<Vec<PairConfig>, DomainError> {
        self.pairs
            .iter()
            .map(|pair| {
                Ok(PairConfig {
                    id: PairId::new(&pair.name)?,
                    local_root: self.local_root.join(&pair.local_path),
                    remote_root: format!(
                        "{}/{}",
                        self.remote_root.trim_end_matches('/'),
                        pair.remote_path.trim_matches('/')
                    ),
                    mode: pair.mode,
                    ignore: pair.ignore.clone(),
                })
            })
            .collect()
    }

    /// Sample configuration written by `skydir config init`.
    #[must_use]
    pub fn sample() -> &'static str {
        r#"# SkyDir configuration

# OAuth token for the cloud backend.
# Token acquisition is not handled by SkyDir; obtain one from your
# provider's developer console and paste it here.
token: "your_oauth_token_here"

# Root folder on the remote side where all pairs live.
remote_root: "/SkyDir"

# Local root directory all pair paths are relative to.
local_root: "/home/user/SkyDir"

# Directory pairs. Modes: upload, download, bidirectional.
pairs:
  - name: documents
    local_path: documents
    remote_path: documents
    mode: bidirectional
    ignore:
      - "*.tmp"
      - ".git"

  - name: photos
    local_path: photos
    remote_path: photos
    mode: upload

  - name: backups
    local_path: backups
    remote_path: backups
    mode: download

daemon:
  # Seconds between periodic reconciliation passes.
  sync_interval: 300
  # React to filesystem change events in addition to the timer.
  watch: true
  # Quiet window (seconds) before a change burst triggers a pass.
  debounce_delay: 5

logging:
  level: info
  # file: /var/log/skydir/skydird.log

api:
  base_url: "https://cloud-api.yandex.net"
  timeout_secs: 30
"#
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> Config {
        Config {
            token: "t0ken".to_string(),
            remote_root: "/SkyDir".to_string(),
            local_root: PathBuf::from("/home/user/SkyDir"),
            pairs: vec![PairEntry {
                name: "documents".to_string(),
                local_path: "documents".to_string(),
                remote_path: "documents".to_string(),
                mode: SyncMode::Bidirectional,
                ignore: vec![],
            }],
            daemon: DaemonConfig::default(),
            logging: LoggingConfig::default(),
            api: ApiConfig::default(),
        }
    }

    #[test]
    fn test_sample_parses_and_has_expected_pairs() {
        let config: Config = serde_yaml::from_str(Config::sample()).unwrap();
        assert_eq!(config.pairs.len(), 3);
        assert_eq!(config.pairs[0].mode, SyncMode::Bidirectional);
        assert_eq!(config.pairs[1].mode, SyncMode::Upload);
        assert_eq!(config.pairs[2].mode, SyncMode::Download);
        assert_eq!(config.daemon.sync_interval, 300);
    }

    #[test]
    fn test_sample_fails_validation_on_placeholder_token() {
        let config: Config = serde_yaml::from_str(Config::sample()).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_minimal() {
        assert!(minimal_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let mut config = minimal_config();
        config.pairs.push(config.pairs[0].clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_relative_roots() {
        let mut config = minimal_config();
        config.remote_root = "SkyDir".to_string();
        assert!(config.validate().is_err());

        let mut config = minimal_config();
        config.local_root = PathBuf::from("relative/root");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pair_configs_join_roots() {
        let pairs = minimal_config().pair_configs().unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].id.as_str(), "documents");
        assert_eq!(
            pairs[0].local_root,
            PathBuf::from("/home/user/SkyDir/documents")
        );
        assert_eq!(pairs[0].remote_root, "/SkyDir/documents");
    }

    #[test]
    fn test_mode_defaults_to_bidirectional() {
        let yaml = r#"
token: "t"
remote_root: "/r"
local_root: "/l"
pairs:
  - name: docs
    local_path: docs
    remote_path: docs
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.pairs[0].mode, SyncMode::Bidirectional);
    }
}
