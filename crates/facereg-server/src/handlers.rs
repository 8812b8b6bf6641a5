//! HTTP handlers for the registry API.
//!
//! Each handler is a thin mapping onto one [`RegistryOps`] operation.
//! Outcomes, failures included, are answered with HTTP 200 and a
//! structured body; only requests axum cannot extract (malformed JSON,
//! missing query parameters) are rejected at the HTTP level.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Service status |
//! | `POST` | `/addUser` | Enroll an embedding |
//! | `POST` | `/verify` | Verify an embedding |
//! | `GET` | `/api/events` | List events |
//! | `DELETE` | `/api/events/{event_name}` | Delete an event |
//! | `GET` | `/api/all_user` | List the users of an event |
//! | `GET` / `DELETE` | `/api/delete_user` | Delete a user |
//! | `GET` | `/api/debug/registry` | Raw registry with provenance |
//!
//! [`RegistryOps`]: facereg_core::ops::RegistryOps

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use facereg_core::ops::RegistryError;
use facereg_store::SnapshotSource;
use facereg_types::{
    Acknowledge, Embedding, EnrollReceipt, EventDeleted, EventList, OpResponse, Registry,
    UserDeleted, UserList, Verdict,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::AppState;

const NO_EVENT: &str = "No event was provided";

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /addUser`.
#[derive(Debug, Deserialize)]
pub struct AddUserRequest {
    /// Event to enroll into.
    pub event_name: String,
    /// User to enroll.
    pub username: String,
    /// Face embedding produced upstream.
    pub embedding: Embedding,
}

/// Body of `POST /verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Event to verify against.
    pub event_name: String,
    /// Face embedding produced upstream.
    pub embedding: Embedding,
    /// Liveness signal from an upstream spoofing detector, echoed back.
    #[serde(default)]
    pub spoofing_detect: Option<bool>,
}

/// Query parameters for `GET /api/all_user`.
#[derive(Debug, Deserialize)]
pub struct EventQuery {
    /// Event to list.
    pub event_name: String,
}

/// Query parameters for `/api/delete_user`.
#[derive(Debug, Deserialize)]
pub struct DeleteUserQuery {
    /// Event the user belongs to.
    pub event_name: String,
    /// User to delete.
    pub user_id: String,
}

/// Body of `GET /`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Fixed liveness message.
    pub message: &'static str,
    /// Configured storage backend.
    pub storage: &'static str,
}

/// Body of `GET /api/debug/registry`.
#[derive(Debug, Serialize)]
pub struct RawRegistryResponse {
    /// The registry as the store loaded it.
    pub raw_data: Registry,
    /// Where `raw_data` came from.
    pub source: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /` -- liveness and storage mode.
pub async fn index(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "Face Recognition API is running!",
        storage: state.storage_mode.label(),
    })
}

/// `POST /addUser` -- append an embedding to a user.
pub async fn add_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddUserRequest>,
) -> Json<OpResponse<EnrollReceipt>> {
    info!(event = %request.event_name, user = %request.username, "Add user requested");
    if request.event_name.is_empty() {
        return Json(OpResponse::error(NO_EVENT));
    }

    let result = state
        .ops
        .enroll_user(&request.event_name, &request.username, request.embedding)
        .await;
    let response = OpResponse::from_result(result);
    info!(status = ?response.status, "Add user finished");
    Json(response)
}

/// `POST /verify` -- verify an embedding against one event.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyRequest>,
) -> Json<Verdict> {
    info!(event = %request.event_name, "Verify requested");
    if request.event_name.is_empty() {
        return Json(Verdict::rejected(NO_EVENT.to_owned(), false));
    }

    let mut verdict = state
        .ops
        .verify_user(&request.event_name, &request.embedding)
        .await
        .unwrap_or_else(RegistryError::into_rejection);
    if let Some(spoofing) = request.spoofing_detect {
        verdict = verdict.with_spoofing(spoofing);
    }
    info!(
        event = %request.event_name,
        flag = verdict.flag,
        confidence = verdict.confidence,
        "Verify finished"
    );
    Json(verdict)
}

/// `GET /api/events` -- every event with its user count.
pub async fn list_events(State(state): State<Arc<AppState>>) -> Json<OpResponse<EventList>> {
    let events = state.ops.list_events().await;
    Json(OpResponse::success(events.acknowledgement(), events))
}

/// `DELETE /api/events/{event_name}` -- delete an event and its users.
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(event_name): Path<String>,
) -> Json<OpResponse<EventDeleted>> {
    let response = OpResponse::from_result(state.ops.delete_event(&event_name).await);
    info!(event = %event_name, status = ?response.status, "Delete event finished");
    Json(response)
}

/// `GET /api/all_user?event_name=` -- the user keys of one event.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventQuery>,
) -> Json<OpResponse<UserList>> {
    let users = state.ops.list_users(&query.event_name).await;
    Json(OpResponse::success(users.acknowledgement(), users))
}

/// `GET|DELETE /api/delete_user?event_name=&user_id=` -- delete one user.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeleteUserQuery>,
) -> Json<OpResponse<UserDeleted>> {
    let result = state
        .ops
        .delete_user(&query.event_name, &query.user_id)
        .await;
    let response = OpResponse::from_result(result);
    info!(
        event = %query.event_name,
        user = %query.user_id,
        status = ?response.status,
        "Delete user finished"
    );
    Json(response)
}

/// `GET /api/debug/registry` -- the registry exactly as loaded.
pub async fn raw_registry(State(state): State<Arc<AppState>>) -> Json<RawRegistryResponse> {
    let snapshot = state.ops.raw_registry().await;
    let source = match snapshot.source {
        SnapshotSource::Document => String::from("document"),
        SnapshotSource::Missing(reason) => format!("missing: {reason}"),
        SnapshotSource::Malformed(error) => format!("malformed: {error}"),
    };
    info!(events = snapshot.registry.len(), source = %source, "Raw registry requested");
    Json(RawRegistryResponse {
        raw_data: snapshot.registry,
        source,
    })
}
