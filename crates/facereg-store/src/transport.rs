//! Blob transport: fetch and store the single registry document.
//!
//! Uses enum dispatch instead of trait objects because async methods are
//! not dyn-compatible in Rust. Consumers hold a [`BlobTransport`] and never
//! learn which mode is active.
//!
//! | Mode | Fetch | Store |
//! |------|-------|-------|
//! | [`HttpBlobTransport`] | `GET` with cache-buster, bounded fixed-delay retries | `PUT`, no retry |
//! | [`FileBlobTransport`] | single file read | unique temp file + rename |
//! | [`MemoryBlobTransport`] | shared in-process cell | shared in-process cell |
//!
//! Fetch never fails. It returns [`FetchOutcome::Absent`] with a reason that
//! keeps "confirmed absent" apart from "gave up after transient failures".
//! Store failures are always returned, since swallowing them would lose
//! data silently.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// Default number of fetch attempts against the remote endpoint.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default fixed delay between fetch attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Outcomes and configuration
// ---------------------------------------------------------------------------

/// Result of fetching the registry document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The document bytes.
    Found(Vec<u8>),
    /// No document could be obtained. Callers treat this as an empty registry.
    Absent(AbsentReason),
}

/// Why a fetch produced no document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsentReason {
    /// The backend confirmed there is no document (HTTP 404, missing file).
    NotFound,
    /// Transient failures used up the attempt budget.
    Unavailable {
        /// Attempts made before giving up.
        attempts: u32,
        /// The last failure observed.
        last_error: String,
    },
}

impl std::fmt::Display for AbsentReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "no registry document exists yet"),
            Self::Unavailable {
                attempts,
                last_error,
            } => write!(f, "unavailable after {attempts} attempts: {last_error}"),
        }
    }
}

/// Settings for the remote HTTP blob endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBlobConfig {
    /// Base URL of the blob endpoint (e.g. `https://blobs.example.com/raw`).
    pub base_url: String,
    /// Object key of the registry document under `base_url`.
    pub object_key: String,
    /// Optional bearer token sent on reads and writes.
    pub api_key: Option<String>,
    /// Fetch attempts before giving up (at least one is always made).
    pub max_attempts: u32,
    /// Fixed delay between fetch attempts.
    pub retry_delay: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl RemoteBlobConfig {
    /// Config for `base_url`/`object_key` with default retry settings.
    pub fn new(base_url: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            object_key: object_key.into(),
            api_key: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Which persistence mode to construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// Remote HTTP blob endpoint.
    Remote(RemoteBlobConfig),
    /// Plain local file, no network dependency.
    LocalFile(PathBuf),
    /// In-process document, lost on restart.
    Memory,
}

// ---------------------------------------------------------------------------
// Unified transport enum
// ---------------------------------------------------------------------------

/// The registry document's persistence backend.
pub enum BlobTransport {
    /// Remote HTTP blob endpoint.
    Remote(HttpBlobTransport),
    /// Local file.
    LocalFile(FileBlobTransport),
    /// In-process cell.
    Memory(MemoryBlobTransport),
}

impl BlobTransport {
    /// Build a transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] or [`StoreError::Http`] if the remote
    /// client cannot be constructed.
    pub fn from_config(config: &TransportConfig) -> Result<Self, StoreError> {
        Ok(match config {
            TransportConfig::Remote(remote) => Self::Remote(HttpBlobTransport::new(remote)?),
            TransportConfig::LocalFile(path) => Self::LocalFile(FileBlobTransport::new(path)),
            TransportConfig::Memory => Self::Memory(MemoryBlobTransport::new()),
        })
    }

    /// Fetch the registry document.
    pub async fn fetch(&self) -> FetchOutcome {
        match self {
            Self::Remote(t) => t.fetch().await,
            Self::LocalFile(t) => t.fetch().await,
            Self::Memory(t) => t.fetch().await,
        }
    }

    /// Overwrite the registry document.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] whenever the write did not durably apply.
    pub async fn store(&self, bytes: Vec<u8>) -> Result<(), StoreError> {
        match self {
            Self::Remote(t) => t.store(bytes).await,
            Self::LocalFile(t) => t.store(bytes).await,
            Self::Memory(t) => {
                t.store(bytes).await;
                Ok(())
            }
        }
    }

    /// Human-readable mode name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Remote(_) => "remote",
            Self::LocalFile(_) => "local-file",
            Self::Memory(_) => "memory",
        }
    }
}

// ---------------------------------------------------------------------------
// Remote HTTP blob endpoint
// ---------------------------------------------------------------------------

/// Failure of a single fetch attempt.
enum AttemptError {
    Status(StatusCode),
    Transport(String),
}

/// Reads and writes the registry document at `{base_url}/{object_key}`.
pub struct HttpBlobTransport {
    client: reqwest::Client,
    object_url: String,
    api_key: Option<String>,
    max_attempts: u32,
    retry_delay: Duration,
    last_cache_buster: AtomicU64,
}

impl HttpBlobTransport {
    /// Create a transport for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the base URL or object key is
    /// empty, or [`StoreError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &RemoteBlobConfig) -> Result<Self, StoreError> {
        let base = config.base_url.trim_end_matches('/');
        let key = config.object_key.trim_start_matches('/');
        if base.is_empty() || key.is_empty() {
            return Err(StoreError::Config(String::from(
                "remote storage needs both a base URL and an object key",
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            object_url: format!("{base}/{key}"),
            api_key: config.api_key.clone(),
            max_attempts: config.max_attempts,
            retry_delay: config.retry_delay,
            last_cache_buster: AtomicU64::new(0),
        })
    }

    /// The document URL without query parameters.
    pub fn object_url(&self) -> &str {
        &self.object_url
    }

    /// Next cache-busting value: wall-clock milliseconds, bumped past the
    /// previous value when the clock has not advanced.
    fn next_cache_buster(&self) -> u64 {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        let advance = |last: u64| now.max(last.saturating_add(1));
        let previous = self
            .last_cache_buster
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(advance(last)))
            .unwrap_or_else(|last| last);
        advance(previous)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn fetch_once(&self) -> Result<Vec<u8>, AttemptError> {
        let url = format!("{}?cb={}", self.object_url, self.next_cache_buster());
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AttemptError::Status(status));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| AttemptError::Transport(e.to_string()))
    }

    /// Fetch the document, retrying on any non-200 response or transport
    /// error with a fixed delay between attempts.
    pub async fn fetch(&self) -> FetchOutcome {
        let attempts = self.max_attempts.max(1);
        let mut last_error = String::new();
        let mut confirmed_missing = false;

        for attempt in 1..=attempts {
            info!(attempt, max_attempts = attempts, "Fetching registry document");
            match self.fetch_once().await {
                Ok(bytes) => {
                    debug!(attempt, bytes = bytes.len(), "Registry document fetched");
                    return FetchOutcome::Found(bytes);
                }
                Err(AttemptError::Status(status)) => {
                    confirmed_missing = status == StatusCode::NOT_FOUND;
                    last_error = format!("HTTP {status}");
                }
                Err(AttemptError::Transport(e)) => {
                    confirmed_missing = false;
                    last_error = e;
                }
            }

            if attempt < attempts {
                warn!(
                    attempt,
                    max_attempts = attempts,
                    error = %last_error,
                    delay_ms = self.retry_delay.as_millis(),
                    "Registry fetch failed, retrying"
                );
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        if confirmed_missing {
            info!(attempts, "No registry document on the blob endpoint");
            FetchOutcome::Absent(AbsentReason::NotFound)
        } else {
            warn!(
                attempts,
                error = %last_error,
                "Registry document unavailable, continuing with an empty registry"
            );
            FetchOutcome::Absent(AbsentReason::Unavailable {
                attempts,
                last_error,
            })
        }
    }

    /// Overwrite the document and ask intermediaries to drop cached copies.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Http`] on transport failure or
    /// [`StoreError::Remote`] on a non-success status.
    pub async fn store(&self, bytes: Vec<u8>) -> Result<(), StoreError> {
        let url = format!("{}?overwrite=true&invalidate=true", self.object_url);
        let size = bytes.len();

        let response = self
            .authorize(self.client.put(&url))
            .header("Content-Type", "application/json")
            .header("Cache-Control", "no-cache")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(StoreError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        info!(bytes = size, "Registry document uploaded");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Local file
// ---------------------------------------------------------------------------

/// Reads and writes the registry document as a plain local file.
pub struct FileBlobTransport {
    path: PathBuf,
}

impl FileBlobTransport {
    /// Create a transport for the file at `path`.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// The registry file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file. A missing file is a confirmed absence.
    pub async fn fetch(&self) -> FetchOutcome {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                info!(path = %self.path.display(), "Loaded registry from local file");
                FetchOutcome::Found(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "Local registry file not found");
                FetchOutcome::Absent(AbsentReason::NotFound)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read local registry file");
                FetchOutcome::Absent(AbsentReason::Unavailable {
                    attempts: 1,
                    last_error: e.to_string(),
                })
            }
        }
    }

    /// Replace the file via a uniquely named sibling temporary file and a
    /// rename, so concurrent writers never share staging state and readers
    /// only ever see a complete document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if any step fails.
    pub async fn store(&self, bytes: Vec<u8>) -> Result<(), StoreError> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                tokio::fs::create_dir_all(parent).await?;
                parent.to_path_buf()
            }
            None => PathBuf::from("."),
        };

        let target = self.path.clone();
        let len = bytes.len();
        tokio::task::spawn_blocking(move || replace_file(&dir, &target, &bytes))
            .await
            .map_err(std::io::Error::other)??;

        info!(path = %self.path.display(), bytes = len, "Saved registry to local file");
        Ok(())
    }
}

/// Stage `bytes` in a fresh temp file inside `dir`, then rename it over
/// `target`. The temp file is removed if anything fails before the rename.
fn replace_file(dir: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut staging = tempfile::NamedTempFile::new_in(dir)?;
    staging.write_all(bytes)?;
    staging.as_file().sync_all()?;
    staging.persist(target).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Holds the registry document in process memory.
///
/// Clones share the same document, so several stores built from clones
/// behave like independent clients of one remote blob.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobTransport {
    document: Arc<RwLock<Option<Vec<u8>>>>,
}

impl MemoryBlobTransport {
    /// An empty cell (fetch reports [`AbsentReason::NotFound`]).
    pub fn new() -> Self {
        Self::default()
    }

    /// A cell pre-loaded with `bytes`.
    pub fn with_document(bytes: Vec<u8>) -> Self {
        Self {
            document: Arc::new(RwLock::new(Some(bytes))),
        }
    }

    /// The current document bytes, if any.
    pub async fn document(&self) -> Option<Vec<u8>> {
        self.document.read().await.clone()
    }

    /// Read the document.
    pub async fn fetch(&self) -> FetchOutcome {
        self.document
            .read()
            .await
            .clone()
            .map_or(FetchOutcome::Absent(AbsentReason::NotFound), FetchOutcome::Found)
    }

    /// Replace the document.
    pub async fn store(&self, bytes: Vec<u8>) {
        *self.document.write().await = Some(bytes);
    }
}
