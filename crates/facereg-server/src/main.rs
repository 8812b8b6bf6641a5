//! Face registry server binary.
//!
//! This is the entry point that wires configuration, the blob transport,
//! and the registry operations into the HTTP API.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `facereg-config.yaml` and the environment
//! 3. Construct the blob transport for the configured storage mode
//! 4. Build the registry operations and shared state
//! 5. Serve the HTTP API until `Ctrl-C`

mod error;

use std::sync::Arc;

use facereg_core::config::ServiceConfig;
use facereg_core::matching::MatchEngine;
use facereg_core::ops::RegistryOps;
use facereg_server::{AppState, start_server};
use facereg_store::{BlobTransport, EmbeddingStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, transport construction, or the
/// server fails.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("facereg-server starting");

    // 2. Load configuration.
    let config = ServiceConfig::load()?;
    info!(
        storage_mode = config.storage.mode.label(),
        threshold = config.matching.threshold,
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    // 3. Blob transport.
    let transport = BlobTransport::from_config(&config.storage.transport())?;
    info!(transport = transport.name(), "Blob transport initialized");

    // 4. Registry operations.
    let ops = RegistryOps::new(
        EmbeddingStore::new(transport),
        MatchEngine::new(config.matching.threshold),
    );
    let state = Arc::new(AppState::new(ops, config.storage.mode));

    // 5. Serve.
    start_server(&config.server, state).await?;

    info!("facereg-server stopped");
    Ok(())
}
