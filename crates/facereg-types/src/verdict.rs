//! Verification verdicts.
//!
//! A [`Verdict`] is the structured outcome of one verification attempt. The
//! field names are the service's established wire contract and are kept
//! as-is for client compatibility.

use serde::{Deserialize, Serialize};

/// The outcome of verifying a face against one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// `true` only when a stored embedding was under the match threshold.
    pub flag: bool,
    /// The matched user. Never set for a near miss.
    pub username: Option<String>,
    /// Human-readable description of the outcome.
    pub message: String,
    /// Cosmetic score `round((1 - distance) * 100, 2)`; `0.0` when there is
    /// no match. Not a probability and not bounded to `[0, 100]`.
    #[serde(default)]
    pub confidence: f64,
    /// Whether the face belongs to an enrolled user.
    pub user_in_system: bool,
    /// Whether a face was present in the query image.
    pub face_detected: bool,
    /// Advisory liveness signal from the spoofing detector, when it ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spoofing_detect: Option<bool>,
}

impl Verdict {
    /// A successful match.
    pub fn matched(username: String, confidence: f64, message: String) -> Self {
        Self {
            flag: true,
            username: Some(username),
            message,
            confidence,
            user_in_system: true,
            face_detected: true,
            spoofing_detect: None,
        }
    }

    /// A non-match. `face_detected` comes from the caller's context.
    pub const fn rejected(message: String, face_detected: bool) -> Self {
        Self {
            flag: false,
            username: None,
            message,
            confidence: 0.0,
            user_in_system: false,
            face_detected,
            spoofing_detect: None,
        }
    }

    /// Attach the spoofing detector's result.
    #[must_use]
    pub const fn with_spoofing(mut self, spoofing_detect: bool) -> Self {
        self.spoofing_detect = Some(spoofing_detect);
        self
    }
}
