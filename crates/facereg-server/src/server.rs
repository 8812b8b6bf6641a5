//! Listener setup and the serve loop.
//!
//! [`start_server`] is what the binary runs: bind the configured address,
//! then serve until `Ctrl-C`. [`bind`] and [`serve`] are split out so a
//! caller can bind an ephemeral port and choose its own shutdown trigger.

use std::future::Future;
use std::io;
use std::sync::Arc;

use facereg_core::config::ServerSettings;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::router::build_router;
use crate::state::AppState;

/// Failures while binding or serving the registry API.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The configured address could not be resolved or bound.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        /// `host:port` as configured.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Accepting or serving connections failed fatally.
    #[error("serve failed: {0}")]
    Serve(#[from] io::Error),
}

/// Bind a listener on `settings.host:settings.port`.
///
/// The host may be an IP literal or a resolvable name. Port `0` picks an
/// ephemeral port; read it back with [`TcpListener::local_addr`].
///
/// # Errors
///
/// [`ServerError::Bind`] if the address does not resolve or is in use.
pub async fn bind(settings: &ServerSettings) -> Result<TcpListener, ServerError> {
    TcpListener::bind((settings.host.as_str(), settings.port))
        .await
        .map_err(|source| ServerError::Bind {
            addr: format!("{}:{}", settings.host, settings.port),
            source,
        })
}

/// Serve the registry API on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish before this returns.
///
/// # Errors
///
/// [`ServerError::Serve`] on a fatal I/O error.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, storage = state.storage_mode.label(), "Registry API listening");
    }
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Bind the configured address and serve until `Ctrl-C`.
///
/// # Errors
///
/// See [`bind`] and [`serve`].
pub async fn start_server(
    settings: &ServerSettings,
    state: Arc<AppState>,
) -> Result<(), ServerError> {
    let listener = bind(settings).await?;
    serve(listener, state, ctrl_c()).await
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
    }
}
