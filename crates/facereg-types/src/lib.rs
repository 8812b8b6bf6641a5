//! Shared type definitions for the face registry service.
//!
//! This crate is the single source of truth for the data model that flows
//! between the store, the matching engine, and the HTTP layer.
//!
//! # Modules
//!
//! - [`embedding`] -- Face embedding vectors and stored-vector records
//! - [`registry`] -- The persisted event -> user -> embeddings mapping
//! - [`verdict`] -- Verification verdicts returned to callers
//! - [`responses`] -- Structured operation responses (`status` + `message`)

pub mod embedding;
pub mod registry;
pub mod responses;
pub mod verdict;

// Re-export all public types at crate root for convenience.
pub use embedding::{Embedding, StoredVector};
pub use registry::{EventEntry, EventUsers, Registry, UserEntry, UserRemoval};
pub use responses::{
    Acknowledge, EnrollReceipt, EventDeleted, EventList, EventSummary, OpResponse, OpStatus,
    UserDeleted, UserList,
};
pub use verdict::Verdict;
