//! Matching, registry operations, and configuration for the face registry.
//!
//! This crate owns everything between the HTTP layer and the persisted
//! document: verifying a face against an event, enrolling and deleting
//! users, and the image pipeline that feeds embeddings in.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `facereg-config.yaml` plus
//!   environment overrides into strongly-typed structs.
//! - [`matching`] -- [`MatchEngine`] and the first-under-threshold scan.
//! - [`ops`] -- [`RegistryOps`], the load/mutate/save operations.
//! - [`pipeline`] -- [`FacePipeline`] over the [`FaceEmbedder`] and
//!   [`SpoofDetector`] collaborators.
//!
//! [`MatchEngine`]: matching::MatchEngine
//! [`RegistryOps`]: ops::RegistryOps
//! [`FacePipeline`]: pipeline::FacePipeline
//! [`FaceEmbedder`]: pipeline::FaceEmbedder
//! [`SpoofDetector`]: pipeline::SpoofDetector

pub mod config;
pub mod matching;
pub mod ops;
pub mod pipeline;
