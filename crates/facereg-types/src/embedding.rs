//! Face embedding vectors.
//!
//! An [`Embedding`] is the numeric representation of a face produced by the
//! upstream extractor. Its dimensionality is fixed by that extractor and is
//! opaque here: the registry never checks a stored vector's length against
//! anything except the query it is being compared with.
//!
//! Stored records are wrapped in [`StoredVector`] so that a single corrupt
//! entry in the persisted document survives a load/save cycle untouched
//! instead of invalidating the whole registry.

use serde::{Deserialize, Serialize};

/// A face embedding: an ordered sequence of floating-point components.
///
/// Immutable once stored. Serialized as a plain JSON array of numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f64>);

impl Embedding {
    /// Wrap a raw component vector.
    pub const fn new(components: Vec<f64>) -> Self {
        Self(components)
    }

    /// The raw components.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the embedding has no components at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }

    /// Euclidean (L2) distance to `other`.
    ///
    /// Returns `None` when the two vectors differ in length; the caller
    /// decides whether that is an error or a record to skip.
    pub fn l2_distance(&self, other: &Self) -> Option<f64> {
        if self.0.len() != other.0.len() {
            return None;
        }
        let sum: f64 = self
            .0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b).powi(2))
            .sum();
        Some(sum.sqrt())
    }
}

impl From<Vec<f64>> for Embedding {
    fn from(components: Vec<f64>) -> Self {
        Self(components)
    }
}

/// One embedding record as it appears in the persisted document.
///
/// Well-formed records parse as [`StoredVector::Numeric`]. Anything else
/// (strings inside the array, nested objects, a bare number) is kept
/// verbatim as [`StoredVector::Opaque`] so it is written back exactly as it
/// was read. The matching engine skips opaque records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredVector {
    /// A list of numbers.
    Numeric(Embedding),
    /// A record that is not a list of numbers.
    Opaque(serde_json::Value),
}

impl StoredVector {
    /// The numeric embedding, if this record is well-formed.
    pub const fn as_embedding(&self) -> Option<&Embedding> {
        match self {
            Self::Numeric(embedding) => Some(embedding),
            Self::Opaque(_) => None,
        }
    }
}

impl From<Embedding> for StoredVector {
    fn from(embedding: Embedding) -> Self {
        Self::Numeric(embedding)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let e = Embedding::new(vec![0.1, 0.2, 0.3]);
        assert_eq!(e.l2_distance(&e), Some(0.0));
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert_eq!(a.l2_distance(&b), Some(5.0));
    }

    #[test]
    fn distance_rejects_mismatched_arity() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![1.0]);
        assert!(a.l2_distance(&b).is_none());
    }

    #[test]
    fn finite_check_catches_nan_and_infinity() {
        assert!(Embedding::new(vec![0.5, -1.0]).is_finite());
        assert!(!Embedding::new(vec![0.5, f64::NAN]).is_finite());
        assert!(!Embedding::new(vec![f64::INFINITY]).is_finite());
    }

    #[test]
    fn stored_vector_parses_numbers_and_integers() {
        let v: StoredVector = serde_json::from_str("[1, 0.5, -2]").unwrap();
        assert_eq!(
            v.as_embedding().map(Embedding::as_slice),
            Some(&[1.0, 0.5, -2.0][..])
        );
    }

    #[test]
    fn stored_vector_keeps_malformed_records_verbatim() {
        let raw = r#"[0.1,"oops"]"#;
        let v: StoredVector = serde_json::from_str(raw).unwrap();
        assert!(v.as_embedding().is_none());
        assert_eq!(serde_json::to_string(&v).unwrap(), raw);
    }
}
