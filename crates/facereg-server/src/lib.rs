//! HTTP API for the face registry service.
//!
//! This crate maps the registry operations onto an Axum router:
//!
//! - **Enrollment and verification** (`POST /addUser`, `POST /verify`)
//!   taking embeddings produced by an upstream face pipeline
//! - **Event and user management** under `/api`
//! - **Status page** (`GET /`) reporting the storage backend
//!
//! # Architecture
//!
//! Handlers share one [`AppState`] holding the [`RegistryOps`]. Every
//! request is an independent load/save round trip against the store, so
//! the server itself keeps no registry state between requests.
//!
//! [`RegistryOps`]: facereg_core::ops::RegistryOps

pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerError, bind, serve, start_server};
pub use state::AppState;
