//! The embedding store: load and save the whole [`Registry`].
//!
//! Every call is a standalone round trip through the [`BlobTransport`]. The
//! store keeps no cache and takes no locks.
//!
//! # Consistency
//!
//! Mutations are load -> mutate -> save with nothing held in between. Two
//! writers that load the same snapshot both succeed, and the later save
//! replaces the earlier one wholesale (last write wins at document
//! granularity). Deployments that need every write to survive must keep a
//! single writer.
//!
//! The read path never fails: a missing, unreachable, or malformed
//! document loads as an empty registry. A document is malformed only when
//! it is not JSON or its top level is not an object; badly shaped event
//! and user values load as opaque entries instead. The write path always reports
//! failure; the caller's in-memory registry is left as it was and the caller
//! must reload to see what is actually persisted.

use facereg_types::Registry;
use tracing::{error, info};

use crate::error::StoreError;
use crate::transport::{AbsentReason, BlobTransport, FetchOutcome};

/// Where a loaded registry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Parsed from the stored document.
    Document,
    /// No document was available; the registry is empty.
    Missing(AbsentReason),
    /// The document did not have the registry structure; the registry is empty.
    Malformed(String),
}

/// A loaded registry together with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// The registry (empty unless `source` is [`SnapshotSource::Document`]).
    pub registry: Registry,
    /// How the registry was obtained.
    pub source: SnapshotSource,
}

/// Loads and saves the registry through a [`BlobTransport`].
pub struct EmbeddingStore {
    transport: BlobTransport,
}

impl EmbeddingStore {
    /// Create a store over `transport`.
    pub const fn new(transport: BlobTransport) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &BlobTransport {
        &self.transport
    }

    /// Load the registry and report where it came from.
    pub async fn load_snapshot(&self) -> Snapshot {
        match self.transport.fetch().await {
            FetchOutcome::Found(bytes) => match serde_json::from_slice::<Registry>(&bytes) {
                Ok(registry) => {
                    info!(events = registry.len(), "Registry loaded");
                    Snapshot {
                        registry,
                        source: SnapshotSource::Document,
                    }
                }
                Err(e) => {
                    error!(error = %e, "Registry document is malformed, treating as empty");
                    Snapshot {
                        registry: Registry::new(),
                        source: SnapshotSource::Malformed(e.to_string()),
                    }
                }
            },
            FetchOutcome::Absent(reason) => Snapshot {
                registry: Registry::new(),
                source: SnapshotSource::Missing(reason),
            },
        }
    }

    /// Load the registry, degrading to empty on any read-path failure.
    pub async fn load(&self) -> Registry {
        self.load_snapshot().await.registry
    }

    /// Serialize and store the full registry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] or any transport error. The
    /// write did not apply when this returns an error.
    pub async fn save(&self, registry: &Registry) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(registry)?;
        info!(
            events = registry.len(),
            transport = self.transport.name(),
            "Saving registry"
        );
        self.transport.store(bytes).await
    }
}
