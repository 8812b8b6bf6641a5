//! The persisted registry: events -> users -> embeddings.
//!
//! The whole [`Registry`] is the unit of persistence. It is rebuilt from the
//! blob document on every operation and written back whole on every
//! mutation.
//!
//! All maps preserve document order. The matching engine scans users and
//! their embeddings in that order, so it is observable behavior and must
//! survive a load/save round trip unchanged.
//!
//! # Document format
//!
//! ```json
//! {
//!   "conference-2025": {
//!     "alice": [[0.12, -0.4, ...], [0.11, -0.38, ...]],
//!     "bob":   [[0.5, 0.02, ...]]
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::embedding::{Embedding, StoredVector};
use crate::responses::EventSummary;

/// The users enrolled in one event, keyed by user name, in enrollment order.
pub type EventUsers = IndexMap<String, UserEntry>;

/// One user's value in the persisted document.
///
/// A list parses as [`UserEntry::Vectors`] (its items may still be opaque
/// one by one). Any other value (a number, `null`, an object) is kept as
/// [`UserEntry::Opaque`] and written back verbatim. The matching engine
/// skips opaque users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserEntry {
    /// The user's stored embedding records.
    Vectors(Vec<StoredVector>),
    /// A value that is not a list of records.
    Opaque(Value),
}

impl Default for UserEntry {
    fn default() -> Self {
        Self::Vectors(Vec::new())
    }
}

impl UserEntry {
    /// The stored records; empty for an opaque entry.
    pub fn vectors(&self) -> &[StoredVector] {
        match self {
            Self::Vectors(vectors) => vectors,
            Self::Opaque(_) => &[],
        }
    }
}

impl From<Vec<StoredVector>> for UserEntry {
    fn from(vectors: Vec<StoredVector>) -> Self {
        Self::Vectors(vectors)
    }
}

/// One event's value in the persisted document.
///
/// An object parses as [`EventEntry::Users`]. Anything else is kept as
/// [`EventEntry::Opaque`]: it has no readable users, is never listed or
/// matched against, and is written back verbatim until it is deleted or
/// an enrollment replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventEntry {
    /// The event's users.
    Users(EventUsers),
    /// A value that is not a user map.
    Opaque(Value),
}

impl Default for EventEntry {
    fn default() -> Self {
        Self::Users(EventUsers::new())
    }
}

impl EventEntry {
    /// The users of this event, if it is a user map.
    pub const fn users(&self) -> Option<&EventUsers> {
        match self {
            Self::Users(users) => Some(users),
            Self::Opaque(_) => None,
        }
    }

    /// Number of user keys; zero for an opaque entry.
    pub fn user_count(&self) -> usize {
        self.users().map_or(0, IndexMap::len)
    }

    /// Whether the entry is a user map with no users (logically deleted).
    fn is_vacant(&self) -> bool {
        matches!(self, Self::Users(users) if users.is_empty())
    }
}

/// The full registry of events.
///
/// An event with zero users is logically deleted: it is never listed or
/// serialized, it cannot be deleted again, and [`Registry::remove_user`]
/// removes the event in the same mutation that removes its last user.
///
/// Only the top level must be an object for the document to load. Event
/// and user values that do not have the expected shape are carried as
/// opaque entries, so one bad value never costs the rest of the registry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    events: IndexMap<String, EventEntry>,
}

/// What [`Registry::remove_user`] removed.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRemoval {
    /// The removed user's entry.
    pub entry: UserEntry,
    /// Whether the event was removed because it became empty.
    pub event_removed: bool,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of event keys held, vacant and opaque ones included.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the registry holds no event keys at all.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether an event with this exact key exists and is not vacant.
    pub fn contains_event(&self, event: &str) -> bool {
        self.events.get(event).is_some_and(|entry| !entry.is_vacant())
    }

    /// The users of `event`, if it exists and is a user map.
    pub fn event(&self, event: &str) -> Option<&EventUsers> {
        self.events.get(event).and_then(EventEntry::users)
    }

    /// Append `embedding` to `user` in `event`, creating either as needed.
    ///
    /// An opaque event or user value at the target is replaced by the new
    /// enrollment. Returns the user's embedding count after the append.
    pub fn append_embedding(&mut self, event: &str, user: &str, embedding: Embedding) -> usize {
        let slot = self.events.entry(event.to_owned()).or_default();
        let mut users = match std::mem::take(slot) {
            EventEntry::Users(users) => users,
            EventEntry::Opaque(_) => EventUsers::new(),
        };

        let entry = users.entry(user.to_owned()).or_default();
        let mut vectors = match std::mem::take(entry) {
            UserEntry::Vectors(vectors) => vectors,
            UserEntry::Opaque(_) => Vec::new(),
        };
        vectors.push(StoredVector::Numeric(embedding));
        let count = vectors.len();

        *entry = UserEntry::Vectors(vectors);
        *slot = EventEntry::Users(users);
        count
    }

    /// Remove an event and all of its users.
    ///
    /// A vacant event counts as absent and yields `None`.
    pub fn remove_event(&mut self, event: &str) -> Option<EventEntry> {
        if !self.contains_event(event) {
            return None;
        }
        self.events.shift_remove(event)
    }

    /// Remove one user from an event.
    ///
    /// If the event has no users left afterwards it is removed too, so the
    /// caller persists a single consistent snapshot. Returns `None` when
    /// either the event or the user does not exist.
    pub fn remove_user(&mut self, event: &str, user: &str) -> Option<UserRemoval> {
        let EventEntry::Users(users) = self.events.get_mut(event)? else {
            return None;
        };
        let entry = users.shift_remove(user)?;
        let event_removed = users.is_empty();
        if event_removed {
            self.events.shift_remove(event);
        }
        Some(UserRemoval {
            entry,
            event_removed,
        })
    }

    /// Events that have at least one user, with their user counts, in
    /// document order.
    pub fn summaries(&self) -> Vec<EventSummary> {
        self.events
            .iter()
            .filter_map(|(name, entry)| entry.users().map(|users| (name, users.len())))
            .filter(|(_, user_count)| *user_count > 0)
            .map(|(name, user_count)| EventSummary {
                event_name: name.clone(),
                user_count,
            })
            .collect()
    }

    /// User keys of `event` in enrollment order (empty if the event is absent).
    pub fn user_keys(&self, event: &str) -> Vec<String> {
        self.event(event)
            .map(|users| users.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Serialize for Registry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let live = self.events.iter().filter(|(_, entry)| !entry.is_vacant());
        let mut map = serializer.serialize_map(Some(live.clone().count()))?;
        for (name, entry) in live {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}
