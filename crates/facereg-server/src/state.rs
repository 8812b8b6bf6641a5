//! Shared application state for the registry API.
//!
//! [`AppState`] owns the [`RegistryOps`] built at startup. Handlers share it
//! through an `Arc`; no request holds a lock across the store round trip.

use facereg_core::config::StorageMode;
use facereg_core::ops::RegistryOps;

/// State shared by every handler.
pub struct AppState {
    /// The registry operations over the configured store.
    pub ops: RegistryOps,
    /// The configured storage backend, reported by the status endpoint.
    pub storage_mode: StorageMode,
}

impl AppState {
    /// Create the shared state.
    pub const fn new(ops: RegistryOps, storage_mode: StorageMode) -> Self {
        Self { ops, storage_mode }
    }
}
