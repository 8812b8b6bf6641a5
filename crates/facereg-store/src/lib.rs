//! Persistence layer for the face registry service.
//!
//! The registry lives in a single JSON document held by a blob backend. This
//! crate moves that document in and out of memory.
//!
//! # Architecture
//!
//! ```text
//! RegistryOps
//!     |
//!     +-- load / save --> EmbeddingStore
//!                             |
//!                             +-- fetch / store --> BlobTransport
//!                                                     |-- Remote    (HTTP blob endpoint)
//!                                                     |-- LocalFile (plain file)
//!                                                     +-- Memory    (in-process)
//! ```
//!
//! # Modules
//!
//! - [`transport`] -- Fetch/store of the raw document with retries
//! - [`store`] -- Registry (de)serialization and degraded-read policy
//! - [`error`] -- Shared error types

pub mod error;
pub mod store;
pub mod transport;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use store::{EmbeddingStore, Snapshot, SnapshotSource};
pub use transport::{
    AbsentReason, BlobTransport, FetchOutcome, FileBlobTransport, HttpBlobTransport,
    MemoryBlobTransport, RemoteBlobConfig, TransportConfig,
};
