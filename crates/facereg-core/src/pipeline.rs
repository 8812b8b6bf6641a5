//! Image-level enrollment and verification.
//!
//! Face detection and liveness checks are external collaborators behind the
//! [`FaceEmbedder`] and [`SpoofDetector`] traits. [`FacePipeline`] runs them
//! in front of [`RegistryOps`]: the spoofing check first (advisory only, it
//! never blocks a verification), then embedding extraction.

use facereg_types::{Embedding, EnrollReceipt, Verdict};
use tracing::{info, warn};

use crate::ops::{RegistryError, RegistryOps};

const NO_EVENT: &str = "No event was provided";

/// Extracts a face embedding from an encoded image.
pub trait FaceEmbedder {
    /// The embedding of the face in `image`, or `None` if no face was found.
    fn extract_embedding(&self, image: &[u8]) -> Option<Embedding>;
}

/// Flags presentation attacks (a phone or printout held up to the camera).
pub trait SpoofDetector {
    /// `true` when the image looks like a spoof.
    fn detect_spoofing(&self, image: &[u8]) -> bool;
}

/// An embedder that returns the same result for every image.
///
/// Used where extraction runs upstream of this service, and in tests.
#[derive(Debug, Clone, Default)]
pub struct FixedEmbedder {
    embedding: Option<Embedding>,
}

impl FixedEmbedder {
    /// Always return `embedding`.
    pub const fn new(embedding: Embedding) -> Self {
        Self {
            embedding: Some(embedding),
        }
    }

    /// Never find a face.
    pub const fn no_face() -> Self {
        Self { embedding: None }
    }
}

impl FaceEmbedder for FixedEmbedder {
    fn extract_embedding(&self, _image: &[u8]) -> Option<Embedding> {
        self.embedding.clone()
    }
}

/// A detector that never reports spoofing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpoofDetector;

impl SpoofDetector for NoSpoofDetector {
    fn detect_spoofing(&self, _image: &[u8]) -> bool {
        false
    }
}

/// Enrollment and verification from raw images.
pub struct FacePipeline<'a, E, S> {
    ops: &'a RegistryOps,
    embedder: E,
    detector: S,
}

impl<'a, E: FaceEmbedder, S: SpoofDetector> FacePipeline<'a, E, S> {
    /// Compose `ops` with the given collaborators.
    pub const fn new(ops: &'a RegistryOps, embedder: E, detector: S) -> Self {
        Self {
            ops,
            embedder,
            detector,
        }
    }

    /// Enroll the face in `image` as `user` in `event`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Validation`] when no event is given,
    /// [`RegistryError::NoFaceDetected`] when extraction finds no face, and
    /// any error from [`RegistryOps::enroll_user`].
    pub async fn enroll_image(
        &self,
        event: &str,
        user: &str,
        image: &[u8],
    ) -> Result<EnrollReceipt, RegistryError> {
        if event.is_empty() {
            warn!("Enrollment request without an event");
            return Err(RegistryError::Validation(NO_EVENT.to_owned()));
        }
        let Some(embedding) = self.embedder.extract_embedding(image) else {
            warn!(event, user, "No face detected in enrollment image");
            return Err(RegistryError::NoFaceDetected);
        };
        self.ops.enroll_user(event, user, embedding).await
    }

    /// Verify the face in `image` against `event`.
    ///
    /// Always answers with a verdict. The spoofing signal is attached to
    /// every verdict produced after the detector ran.
    pub async fn verify_image(&self, event: &str, image: &[u8]) -> Verdict {
        if event.is_empty() {
            warn!("Verification request without an event");
            return Verdict::rejected(NO_EVENT.to_owned(), false);
        }

        let spoofing = self.detector.detect_spoofing(image);
        if spoofing {
            info!(event, "Spoofing suspected in verification image");
        }

        let Some(embedding) = self.embedder.extract_embedding(image) else {
            warn!(event, "No face detected in verification image");
            return RegistryError::NoFaceDetected
                .into_rejection()
                .with_spoofing(spoofing);
        };

        self.ops
            .verify_user(event, &embedding)
            .await
            .unwrap_or_else(RegistryError::into_rejection)
            .with_spoofing(spoofing)
    }
}
