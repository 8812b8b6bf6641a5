//! Error types for the persistence layer.
//!
//! Only the write path and transport construction produce a [`StoreError`].
//! Read-path failures are never errors: they degrade to an absent document
//! (see [`FetchOutcome`](crate::transport::FetchOutcome)).

/// Errors that can occur while persisting the registry.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP request to the blob endpoint could not be completed.
    #[error("blob endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The blob endpoint answered with a non-success status.
    #[error("blob endpoint returned {status}: {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// A local file operation failed.
    #[error("local registry file error: {0}")]
    Io(#[from] std::io::Error),

    /// The registry could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The transport configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),
}
