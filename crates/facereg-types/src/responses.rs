//! Structured operation responses.
//!
//! Every registry operation reports a `status` (`success` / `error`) and a
//! human-readable `message`, plus operation-specific fields flattened into
//! the same JSON object:
//!
//! ```json
//! {"status": "success", "message": "User 'alice' successfully added to event 'expo'",
//!  "event_name": "expo", "username": "alice", "embedding_count": 2}
//! ```
//!
//! Failures never cross the operation boundary as panics; they become an
//! [`OpResponse`] with [`OpStatus::Error`] and no payload.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Outcome status of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpStatus {
    /// The operation applied (or the read completed).
    Success,
    /// The operation was rejected or did not durably apply.
    Error,
}

/// A success payload that can describe itself in one sentence.
pub trait Acknowledge {
    /// The success message reported alongside the payload.
    fn acknowledgement(&self) -> String;
}

/// Wire shape of every registry operation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpResponse<T> {
    /// Success or error.
    pub status: OpStatus,
    /// Human-readable description of the outcome.
    pub message: String,
    /// Operation-specific fields, present on success only.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
}

impl<T> OpResponse<T> {
    /// A successful response carrying `payload`.
    pub fn success(message: impl Into<String>, payload: T) -> Self {
        Self {
            status: OpStatus::Success,
            message: message.into(),
            payload: Some(payload),
        }
    }

    /// An error response with no payload.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: OpStatus::Error,
            message: message.into(),
            payload: None,
        }
    }

    /// Whether the status is [`OpStatus::Success`].
    pub const fn is_success(&self) -> bool {
        matches!(self.status, OpStatus::Success)
    }
}

impl<T: Acknowledge> OpResponse<T> {
    /// Flatten an operation result into a response.
    ///
    /// The error's `Display` output becomes the message.
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(payload) => Self::success(payload.acknowledgement(), payload),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

/// One row of the event listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Event key.
    pub event_name: String,
    /// Number of enrolled users.
    pub user_count: usize,
}

/// Result of enrolling an embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollReceipt {
    /// Event the user was enrolled in.
    pub event_name: String,
    /// The enrolled user.
    pub username: String,
    /// The user's embedding count after this enrollment.
    pub embedding_count: usize,
}

impl Acknowledge for EnrollReceipt {
    fn acknowledgement(&self) -> String {
        format!(
            "User '{}' successfully added to event '{}'",
            self.username, self.event_name
        )
    }
}

/// All events with their user counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventList {
    /// Events in document order.
    pub events: Vec<EventSummary>,
}

impl Acknowledge for EventList {
    fn acknowledgement(&self) -> String {
        format!("Found {} events", self.events.len())
    }
}

/// The user keys of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserList {
    /// Event that was listed.
    pub event_name: String,
    /// User keys in enrollment order.
    pub users: Vec<String>,
}

impl Acknowledge for UserList {
    fn acknowledgement(&self) -> String {
        format!(
            "Found {} users in event '{}'",
            self.users.len(),
            self.event_name
        )
    }
}

/// Result of deleting an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDeleted {
    /// The deleted event.
    pub event_name: String,
    /// How many users it held.
    pub user_count: usize,
}

impl Acknowledge for EventDeleted {
    fn acknowledgement(&self) -> String {
        format!("Event '{}' deleted", self.event_name)
    }
}

/// Result of deleting a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeleted {
    /// Event the user belonged to.
    pub event_name: String,
    /// The deleted user.
    pub user_id: String,
    /// Whether the event was removed because this was its last user.
    pub event_removed: bool,
}

impl Acknowledge for UserDeleted {
    fn acknowledgement(&self) -> String {
        format!(
            "User '{}' deleted from event '{}'",
            self.user_id, self.event_name
        )
    }
}
