//! Configuration loading and typed config structures for the face registry.
//!
//! The optional configuration file is `facereg-config.yaml` at the working
//! directory (or the path in `FACEREG_CONFIG`). Every field has a default,
//! so the service also runs with no file at all. Environment variables are
//! applied last and win over the file:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `USE_REMOTE_STORAGE` | `storage.mode` (`true` -> remote, `false` -> local) |
//! | `BLOB_BASE_URL` | `storage.remote.base_url` |
//! | `BLOB_OBJECT_KEY` | `storage.remote.object_key` |
//! | `BLOB_API_KEY` | `storage.remote.api_key` |
//! | `LOCAL_REGISTRY_PATH` | `storage.local.path` |
//! | `SERVER_HOST` | `server.host` |
//! | `SERVER_PORT` | `server.port` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use facereg_store::{RemoteBlobConfig, TransportConfig};
use serde::Deserialize;

use crate::matching::MATCH_THRESHOLD;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "facereg-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is present but unusable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// The offending field or environment variable.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServiceConfig {
    /// Where the registry document lives.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Matching policy.
    #[serde(default)]
    pub matching: MatchingConfig,

    /// HTTP listener.
    #[serde(default)]
    pub server: ServerSettings,
}

impl ServiceConfig {
    /// Load configuration the way the binary does.
    ///
    /// Reads `FACEREG_CONFIG` (or [`DEFAULT_CONFIG_FILE`] when unset). A
    /// missing default file is not an error; a missing explicitly named
    /// file is. Environment overrides are applied afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a file cannot be read or parsed, or an
    /// override is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("FACEREG_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable cannot be parsed.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("USE_REMOTE_STORAGE") {
            self.storage.mode = if parse_flag("USE_REMOTE_STORAGE", &val)? {
                StorageMode::Remote
            } else {
                StorageMode::Local
            };
        }
        if let Some(val) = lookup("BLOB_BASE_URL") {
            self.storage.remote.base_url = val;
        }
        if let Some(val) = lookup("BLOB_OBJECT_KEY") {
            self.storage.remote.object_key = val;
        }
        if let Some(val) = lookup("BLOB_API_KEY") {
            self.storage.remote.api_key = Some(val).filter(|k| !k.is_empty());
        }
        if let Some(val) = lookup("LOCAL_REGISTRY_PATH") {
            self.storage.local.path = PathBuf::from(val);
        }
        if let Some(val) = lookup("SERVER_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("SERVER_PORT") {
            self.server.port = val.parse().map_err(|e| ConfigError::Invalid {
                field: "SERVER_PORT",
                reason: format!("{e}"),
            })?;
        }
        Ok(())
    }

    /// Reject values the service cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.matching.threshold;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "matching.threshold",
                reason: format!("must be a positive number, got {threshold}"),
            });
        }
        if self.storage.remote.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "storage.remote.max_attempts",
                reason: String::from("must be at least 1"),
            });
        }
        Ok(())
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Remote HTTP blob endpoint.
    #[default]
    Remote,
    /// Plain local file.
    Local,
    /// In-process only; nothing survives a restart.
    Memory,
}

impl StorageMode {
    /// Human-readable name for logs and the status endpoint.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
            Self::Memory => "memory",
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Which backend to use.
    #[serde(default)]
    pub mode: StorageMode,

    /// Remote endpoint settings (used in `remote` mode).
    #[serde(default)]
    pub remote: RemoteStorageConfig,

    /// Local file settings (used in `local` mode).
    #[serde(default)]
    pub local: LocalStorageConfig,
}

impl StorageConfig {
    /// The transport configuration for the selected mode.
    pub fn transport(&self) -> TransportConfig {
        match self.mode {
            StorageMode::Remote => TransportConfig::Remote(RemoteBlobConfig {
                base_url: self.remote.base_url.clone(),
                object_key: self.remote.object_key.clone(),
                api_key: self.remote.api_key.clone(),
                max_attempts: self.remote.max_attempts,
                retry_delay: Duration::from_millis(self.remote.retry_delay_ms),
                request_timeout: Duration::from_millis(self.remote.request_timeout_ms),
            }),
            StorageMode::Local => TransportConfig::LocalFile(self.local.path.clone()),
            StorageMode::Memory => TransportConfig::Memory,
        }
    }
}

/// Remote blob endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteStorageConfig {
    /// Base URL of the blob endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Object key of the registry document.
    #[serde(default = "default_object_key")]
    pub object_key: String,

    /// Optional bearer token.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Fetch attempts before degrading to an empty registry.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between fetch attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for RemoteStorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            object_key: default_object_key(),
            api_key: None,
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Local file settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalStorageConfig {
    /// Path of the registry file.
    #[serde(default = "default_local_path")]
    pub path: PathBuf,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            path: default_local_path(),
        }
    }
}

/// Matching policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatchingConfig {
    /// L2 distance a stored embedding must be strictly under to match.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Parse a boolean switch the way deployment scripts write them.
fn parse_flag(field: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::Invalid {
            field,
            reason: format!("expected true or false, got '{other}'"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_base_url() -> String {
    "http://localhost:9000/blobs".to_owned()
}

fn default_object_key() -> String {
    "face_recognition/embeddings.json".to_owned()
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    2000
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_local_path() -> PathBuf {
    PathBuf::from("data/embeddings.json")
}

const fn default_threshold() -> f64 {
    MATCH_THRESHOLD
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8000
}
