//! Nearest-neighbor verification over one event's users.
//!
//! The scan is linear: users in enrollment order, then each user's
//! embeddings in enrollment order. Two rules apply during the scan:
//!
//! 1. The first stored embedding strictly under the threshold is returned as
//!    a match immediately, even if a closer embedding appears later.
//! 2. Independently, the scan tracks the global minimum distance (first seen
//!    wins ties). It is only reported when nothing crossed the threshold.
//!
//! Rule 1 means a match is "first under threshold in scan order", not
//! "closest overall". Existing deployments depend on this, so it is kept
//! as-is; reconciling it to always return the global best is a product
//! decision, not a bug fix.
//!
//! Users whose entry is not a list, stored records that are not numeric,
//! and records whose length differs from the query are skipped with a
//! warning and never abort the scan.

use facereg_types::{Embedding, EventUsers, UserEntry};
use tracing::{debug, info, warn};

/// Distance a stored embedding must be strictly under to count as a match.
pub const MATCH_THRESHOLD: f64 = 0.4;

/// Result of scanning one event.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A stored embedding was under the threshold.
    Match {
        /// The user that owns the embedding.
        username: String,
        /// L2 distance to the query.
        distance: f64,
        /// [`confidence`] of `distance`.
        confidence: f64,
    },
    /// Candidates existed but none was under the threshold. The nearest
    /// user is deliberately not reported.
    NearMiss {
        /// Smallest distance seen.
        distance: f64,
        /// Confidence derived from `distance`.
        confidence: f64,
    },
    /// Nothing comparable was stored (no users, or every record skipped).
    NoCandidates,
}

/// Cosmetic score derived from a distance: `(1 - distance) * 100`, rounded
/// to two decimals with halves going to the even digit.
///
/// Not a probability: it goes negative once `distance > 1`.
pub fn confidence(distance: f64) -> f64 {
    let percent = (1.0 - distance) * 100.0;
    (percent * 100.0).round_ties_even() / 100.0
}

/// Linear-scan matcher with a fixed acceptance threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchEngine {
    threshold: f64,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(MATCH_THRESHOLD)
    }
}

impl MatchEngine {
    /// Create an engine with a custom threshold.
    pub const fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The acceptance threshold.
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scan `users` for `query`.
    pub fn best_match(&self, query: &Embedding, users: &EventUsers) -> MatchOutcome {
        let mut nearest: Option<(f64, &str)> = None;

        for (username, entry) in users {
            let UserEntry::Vectors(stored) = entry else {
                warn!(user = %username, "Skipping user whose entry is not a list of embeddings");
                continue;
            };
            for (index, record) in stored.iter().enumerate() {
                let Some(candidate) = record.as_embedding() else {
                    warn!(user = %username, index, "Skipping non-numeric stored embedding");
                    continue;
                };
                let Some(distance) = query.l2_distance(candidate) else {
                    warn!(
                        user = %username,
                        index,
                        stored_len = candidate.len(),
                        query_len = query.len(),
                        "Skipping stored embedding with mismatched length"
                    );
                    continue;
                };

                if nearest.is_none_or(|(best, _)| distance < best) {
                    nearest = Some((distance, username.as_str()));
                }

                if distance < self.threshold {
                    let confidence = confidence(distance);
                    info!(user = %username, distance, confidence, "Match found");
                    return MatchOutcome::Match {
                        username: username.clone(),
                        distance,
                        confidence,
                    };
                }
            }
        }

        match nearest {
            Some((distance, username)) => {
                let confidence = confidence(distance);
                info!(
                    nearest = %username,
                    distance,
                    confidence,
                    threshold = self.threshold,
                    "Most similar face is above threshold"
                );
                MatchOutcome::NearMiss {
                    distance,
                    confidence,
                }
            }
            None => {
                debug!(users = users.len(), "No comparable embeddings");
                MatchOutcome::NoCandidates
            }
        }
    }
}
