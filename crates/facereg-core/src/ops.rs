//! Registry operations: enroll, verify, list, and delete.
//!
//! Each operation is one `load -> inspect/mutate -> save` cycle through the
//! [`EmbeddingStore`]. Nothing is cached between calls and nothing is
//! locked, so concurrent writers race and the last save wins.
//!
//! Reads (`verify_user`, `list_events`, `list_users`) never fail on storage:
//! an unavailable or malformed document reads as an empty registry. Writes
//! report storage failures as [`RegistryError::Storage`].

use facereg_store::{EmbeddingStore, Snapshot, StoreError};
use facereg_types::{
    Embedding, EnrollReceipt, EventDeleted, EventList, UserDeleted, UserList, Verdict,
};
use tracing::{info, warn};

use crate::matching::{MatchEngine, MatchOutcome};

/// Errors returned by registry operations.
///
/// The `Display` output of each variant is the user-facing message.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// An input was empty or malformed.
    #[error("{0}")]
    Validation(String),

    /// The referenced event or user does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The image pipeline found no face.
    #[error("No face detected in image")]
    NoFaceDetected,

    /// A write did not durably apply.
    #[error("Failed to {action}: {source}")]
    Storage {
        /// The operation that failed, e.g. `"delete event"`.
        action: &'static str,
        /// The underlying store error.
        #[source]
        source: StoreError,
    },
}

impl RegistryError {
    fn validation(message: &str) -> Self {
        Self::Validation(message.to_owned())
    }

    /// Express a failed verification as a non-matching verdict.
    ///
    /// Verification always answers with a [`Verdict`]; no face was
    /// considered, so `face_detected` is `false`.
    pub fn into_rejection(self) -> Verdict {
        Verdict::rejected(self.to_string(), false)
    }
}

/// Reject keys that are empty or whitespace-only. Keys are otherwise used
/// exactly as given.
fn require_key(value: &str, message: &str) -> Result<(), RegistryError> {
    if value.trim().is_empty() {
        return Err(RegistryError::validation(message));
    }
    Ok(())
}

fn require_embedding(embedding: &Embedding) -> Result<(), RegistryError> {
    if embedding.is_empty() || !embedding.is_finite() {
        return Err(RegistryError::validation("Valid embedding is required"));
    }
    Ok(())
}

/// The registry operations over one store.
pub struct RegistryOps {
    store: EmbeddingStore,
    engine: MatchEngine,
}

impl RegistryOps {
    /// Create the operations over `store`, matching with `engine`.
    pub const fn new(store: EmbeddingStore, engine: MatchEngine) -> Self {
        Self { store, engine }
    }

    /// The backing store.
    pub const fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    /// The match engine used by [`RegistryOps::verify_user`].
    pub const fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    /// Append `embedding` to `user` in `event`, creating both as needed.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Validation`] for an empty key or an empty/non-finite
    /// embedding; [`RegistryError::Storage`] when the save fails.
    pub async fn enroll_user(
        &self,
        event: &str,
        user: &str,
        embedding: Embedding,
    ) -> Result<EnrollReceipt, RegistryError> {
        require_key(event, "Event name is required")?;
        require_key(user, "Username is required")?;
        require_embedding(&embedding)?;

        let mut registry = self.store.load().await;
        let embedding_count = registry.append_embedding(event, user, embedding);
        self.store
            .save(&registry)
            .await
            .map_err(|source| RegistryError::Storage {
                action: "add user to event",
                source,
            })?;

        info!(event, user, embedding_count, "User enrolled");
        Ok(EnrollReceipt {
            event_name: event.to_owned(),
            username: user.to_owned(),
            embedding_count,
        })
    }

    /// Verify `embedding` against the users of `event`.
    ///
    /// An absent event is not an error; it yields a non-matching verdict.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Validation`] for an empty event name or an
    /// empty/non-finite embedding.
    pub async fn verify_user(
        &self,
        event: &str,
        embedding: &Embedding,
    ) -> Result<Verdict, RegistryError> {
        require_key(event, "Event name is required")?;
        require_embedding(embedding)?;

        let registry = self.store.load().await;
        let Some(users) = registry.event(event).filter(|users| !users.is_empty()) else {
            warn!(event, "Verification against unknown or empty event");
            return Ok(Verdict::rejected(
                format!("Event '{event}' not found or has no registered users"),
                true,
            ));
        };

        let verdict = match self.engine.best_match(embedding, users) {
            MatchOutcome::Match {
                username,
                confidence,
                ..
            } => {
                let message =
                    format!("Face verified successfully for user '{username}' in event '{event}'");
                Verdict::matched(username, confidence, message)
            }
            MatchOutcome::NearMiss { .. } => Verdict::rejected(
                String::from("Face detected but confidence too low for verification"),
                true,
            ),
            MatchOutcome::NoCandidates => {
                Verdict::rejected(format!("No matching face found in event '{event}'"), true)
            }
        };
        Ok(verdict)
    }

    /// All events with their user counts, in document order.
    pub async fn list_events(&self) -> EventList {
        let events = self.store.load().await.summaries();
        info!(count = events.len(), "Listed events");
        EventList { events }
    }

    /// Delete `event` and all of its users.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Validation`] for an empty name,
    /// [`RegistryError::NotFound`] when the event does not exist or has no
    /// users, and
    /// [`RegistryError::Storage`] when the save fails.
    pub async fn delete_event(&self, event: &str) -> Result<EventDeleted, RegistryError> {
        require_key(event, "Event name is required")?;

        let mut registry = self.store.load().await;
        let Some(removed) = registry.remove_event(event) else {
            warn!(event, "Event not found");
            return Err(RegistryError::NotFound(format!("Event '{event}' not found")));
        };
        self.store
            .save(&registry)
            .await
            .map_err(|source| RegistryError::Storage {
                action: "delete event",
                source,
            })?;

        let user_count = removed.user_count();
        info!(event, user_count, "Event deleted");
        Ok(EventDeleted {
            event_name: event.to_owned(),
            user_count,
        })
    }

    /// The user keys of `event`; empty when the event does not exist.
    pub async fn list_users(&self, event: &str) -> UserList {
        let users = self.store.load().await.user_keys(event);
        info!(event, count = users.len(), "Listed users");
        UserList {
            event_name: event.to_owned(),
            users,
        }
    }

    /// Delete `user` from `event`, removing the event too if it empties.
    ///
    /// Both removals happen in memory before a single save.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Validation`] for an empty key,
    /// [`RegistryError::NotFound`] when the event or user does not exist,
    /// and [`RegistryError::Storage`] when the save fails.
    pub async fn delete_user(&self, event: &str, user: &str) -> Result<UserDeleted, RegistryError> {
        const REQUIRED: &str = "Event name and user ID are required";
        require_key(event, REQUIRED)?;
        require_key(user, REQUIRED)?;

        let mut registry = self.store.load().await;
        let Some(removal) = registry.remove_user(event, user) else {
            warn!(event, user, "User not found");
            return Err(RegistryError::NotFound(format!(
                "User '{user}' not found in event '{event}'"
            )));
        };
        self.store
            .save(&registry)
            .await
            .map_err(|source| RegistryError::Storage {
                action: "delete user",
                source,
            })?;

        info!(
            event,
            user,
            embeddings = removal.entry.vectors().len(),
            event_removed = removal.event_removed,
            "User deleted"
        );
        Ok(UserDeleted {
            event_name: event.to_owned(),
            user_id: user.to_owned(),
            event_removed: removal.event_removed,
        })
    }

    /// The registry exactly as the store currently loads it, with provenance.
    pub async fn raw_registry(&self) -> Snapshot {
        self.store.load_snapshot().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use facereg_store::{BlobTransport, MemoryBlobTransport};

    use super::*;

    fn ops() -> RegistryOps {
        RegistryOps::new(
            EmbeddingStore::new(BlobTransport::Memory(MemoryBlobTransport::new())),
            MatchEngine::default(),
        )
    }

    #[tokio::test]
    async fn whitespace_keys_are_rejected() {
        let ops = ops();
        let err = ops
            .enroll_user("  ", "alice", Embedding::new(vec![0.1]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Event name is required");

        let err = ops
            .enroll_user("expo", "\t", Embedding::new(vec![0.1]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Username is required");
    }

    #[tokio::test]
    async fn keys_are_not_trimmed() {
        let ops = ops();
        ops.enroll_user(" expo", "alice", Embedding::new(vec![0.1]))
            .await
            .unwrap();

        assert!(ops.list_users("expo").await.users.is_empty());
        assert_eq!(ops.list_users(" expo").await.users, vec!["alice"]);
    }

    #[tokio::test]
    async fn non_finite_embedding_is_rejected() {
        let ops = ops();
        let err = ops
            .verify_user("expo", &Embedding::new(vec![f64::NAN]))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
        assert_eq!(err.to_string(), "Valid embedding is required");
    }

    #[tokio::test]
    async fn repeated_enrollment_grows_embedding_list() {
        let ops = ops();
        ops.enroll_user("expo", "alice", Embedding::new(vec![0.1, 0.2]))
            .await
            .unwrap();
        let receipt = ops
            .enroll_user("expo", "alice", Embedding::new(vec![0.3, 0.4]))
            .await
            .unwrap();
        assert_eq!(receipt.embedding_count, 2);
        assert_eq!(ops.list_events().await.events[0].user_count, 1);
    }
}
