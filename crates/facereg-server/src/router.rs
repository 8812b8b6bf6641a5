//! Axum router construction for the registry API.
//!
//! Assembles all routes into a single [`Router`] with permissive CORS and
//! request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- service status and storage mode
/// - `POST /addUser` -- enroll an embedding
/// - `POST /verify` -- verify an embedding against an event
/// - `GET /api/events` -- list events
/// - `DELETE /api/events/{event_name}` -- delete an event
/// - `GET /api/all_user` -- list the users of an event
/// - `GET|DELETE /api/delete_user` -- delete a user
/// - `GET /api/debug/registry` -- the raw registry document
///
/// CORS allows any origin so browser clients on other hosts can call in.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/addUser", post(handlers::add_user))
        .route("/verify", post(handlers::verify))
        .route("/api/events", get(handlers::list_events))
        .route("/api/events/{event_name}", delete(handlers::delete_event))
        .route("/api/all_user", get(handlers::list_users))
        .route(
            "/api/delete_user",
            get(handlers::delete_user).delete(handlers::delete_user),
        )
        .route("/api/debug/registry", get(handlers::raw_registry))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
