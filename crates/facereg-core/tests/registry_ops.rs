//! End-to-end behavior of the registry operations over in-memory and
//! local-file storage.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::missing_panics_doc,
    clippy::panic
)]

use facereg_core::matching::MatchEngine;
use facereg_core::ops::{RegistryError, RegistryOps};
use facereg_store::{
    AbsentReason, BlobTransport, EmbeddingStore, FileBlobTransport, MemoryBlobTransport,
    SnapshotSource,
};
use facereg_types::{Embedding, OpResponse};

fn ops_over(cell: &MemoryBlobTransport) -> RegistryOps {
    RegistryOps::new(
        EmbeddingStore::new(BlobTransport::Memory(cell.clone())),
        MatchEngine::default(),
    )
}

fn ops_with_document(document: &str) -> RegistryOps {
    ops_over(&MemoryBlobTransport::with_document(
        document.as_bytes().to_vec(),
    ))
}

fn emb(values: &[f64]) -> Embedding {
    Embedding::new(values.to_vec())
}

// =============================================================================
// Enroll and verify
// =============================================================================

#[tokio::test]
async fn enrolled_embedding_verifies_with_full_confidence() {
    let ops = ops_over(&MemoryBlobTransport::new());
    let embedding = emb(&[0.12, -0.4, 0.9, 0.33]);

    let receipt = ops
        .enroll_user("expo", "alice", embedding.clone())
        .await
        .unwrap();
    assert_eq!(receipt.embedding_count, 1);

    let verdict = ops.verify_user("expo", &embedding).await.unwrap();
    assert!(verdict.flag);
    assert_eq!(verdict.username.as_deref(), Some("alice"));
    assert_eq!(verdict.confidence, 100.0);
    assert!(verdict.user_in_system);
    assert!(verdict.face_detected);
    assert_eq!(
        verdict.message,
        "Face verified successfully for user 'alice' in event 'expo'"
    );
}

#[tokio::test]
async fn enroll_with_empty_event_is_a_validation_error() {
    let ops = ops_over(&MemoryBlobTransport::new());

    let err = ops
        .enroll_user("", "alice", emb(&[0.1, 0.2]))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Validation(_)));
    assert_eq!(err.to_string(), "Event name is required");

    let err = ops.enroll_user("expo", "alice", emb(&[])).await.unwrap_err();
    assert_eq!(err.to_string(), "Valid embedding is required");

    assert!(ops.list_events().await.events.is_empty());
}

#[tokio::test]
async fn verify_against_absent_event_is_a_no_match() {
    let ops = ops_over(&MemoryBlobTransport::new());

    let verdict = ops
        .verify_user("ghost-event", &emb(&[0.1, 0.2]))
        .await
        .unwrap();
    assert!(!verdict.flag);
    assert!(verdict.username.is_none());
    assert!(!verdict.user_in_system);
    assert_eq!(
        verdict.message,
        "Event 'ghost-event' not found or has no registered users"
    );
}

#[tokio::test]
async fn verify_against_event_with_zero_users_is_a_no_match() {
    let ops = ops_with_document(r#"{"expo": {}}"#);

    let verdict = ops.verify_user("expo", &emb(&[0.1, 0.2])).await.unwrap();
    assert!(!verdict.flag);
    assert!(verdict.username.is_none());
    assert_eq!(verdict.confidence, 0.0);
}

#[tokio::test]
async fn first_match_in_scan_order_wins_over_closer_later_match() {
    // At query [0, 0]: "far" is 0.35 away and stored first, "near" is 0.2 away.
    let ops = ops_with_document(r#"{"gala": {"far": [[0.35, 0.0]], "near": [[0.2, 0.0]]}}"#);

    let verdict = ops.verify_user("gala", &emb(&[0.0, 0.0])).await.unwrap();
    assert!(verdict.flag);
    assert_eq!(verdict.username.as_deref(), Some("far"));
    assert!((verdict.confidence - 65.0).abs() < 1e-9);
}

#[tokio::test]
async fn near_miss_withholds_the_nearest_user() {
    let ops = ops_with_document(r#"{"gala": {"carol": [[0.6, 0.0]], "dave": [[0.9, 0.0]]}}"#);

    let verdict = ops.verify_user("gala", &emb(&[0.0, 0.0])).await.unwrap();
    assert!(!verdict.flag);
    assert!(verdict.username.is_none());
    assert!(verdict.face_detected);
    assert_eq!(
        verdict.message,
        "Face detected but confidence too low for verification"
    );
}

#[tokio::test]
async fn malformed_stored_vectors_do_not_abort_verification() {
    let ops = ops_with_document(
        r#"{"gala": {"broken": [["a", "b"]], "short": [[0.1]], "erin": [[0.1, 0.1]]}}"#,
    );

    let verdict = ops.verify_user("gala", &emb(&[0.1, 0.1])).await.unwrap();
    assert_eq!(verdict.username.as_deref(), Some("erin"));
}

#[tokio::test]
async fn event_whose_vectors_are_all_unusable_has_no_matching_face() {
    let ops = ops_with_document(r#"{"gala": {"broken": [["a"]]}}"#);

    let verdict = ops.verify_user("gala", &emb(&[0.1, 0.1])).await.unwrap();
    assert!(!verdict.flag);
    assert_eq!(verdict.message, "No matching face found in event 'gala'");
}

#[tokio::test]
async fn verify_validation_failure_becomes_a_rejection() {
    let ops = ops_over(&MemoryBlobTransport::new());

    let verdict = ops
        .verify_user(" ", &emb(&[0.1]))
        .await
        .unwrap_or_else(RegistryError::into_rejection);
    assert!(!verdict.flag);
    assert!(!verdict.face_detected);
    assert_eq!(verdict.message, "Event name is required");
}

// =============================================================================
// Listing and deletion
// =============================================================================

#[tokio::test]
async fn listing_follows_document_order() {
    let ops = ops_with_document(
        r#"{"zeta": {"u1": [[0.1]]}, "alpha": {"u2": [[0.2]], "u3": [[0.3]]}}"#,
    );

    let events = ops.list_events().await.events;
    let names: Vec<_> = events.iter().map(|e| e.event_name.as_str()).collect();
    assert_eq!(names, ["zeta", "alpha"]);
    assert_eq!(events[1].user_count, 2);

    assert_eq!(ops.list_users("alpha").await.users, ["u2", "u3"]);
    assert!(ops.list_users("missing").await.users.is_empty());
}

#[tokio::test]
async fn deleting_the_last_user_removes_the_event() {
    let cell = MemoryBlobTransport::new();
    let ops = ops_over(&cell);
    ops.enroll_user("expo", "alice", emb(&[0.1])).await.unwrap();
    ops.enroll_user("expo", "bob", emb(&[0.2])).await.unwrap();
    ops.enroll_user("fair", "carol", emb(&[0.3])).await.unwrap();

    let first = ops.delete_user("expo", "alice").await.unwrap();
    assert!(!first.event_removed);

    let last = ops.delete_user("expo", "bob").await.unwrap();
    assert!(last.event_removed);

    let events = ops.list_events().await.events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_name, "fair");

    let stored: serde_json::Value =
        serde_json::from_slice(&cell.document().await.unwrap()).unwrap();
    assert!(stored.get("expo").is_none());
}

#[tokio::test]
async fn deleting_unknown_user_or_event_is_not_found() {
    let ops = ops_with_document(r#"{"expo": {"alice": [[0.1]]}}"#);

    let err = ops.delete_user("expo", "zed").await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));
    assert_eq!(err.to_string(), "User 'zed' not found in event 'expo'");

    let err = ops.delete_user("nope", "alice").await.unwrap_err();
    assert_eq!(err.to_string(), "User 'alice' not found in event 'nope'");

    let err = ops.delete_event("nope").await.unwrap_err();
    assert_eq!(err.to_string(), "Event 'nope' not found");

    let err = ops.delete_user("expo", "").await.unwrap_err();
    assert_eq!(err.to_string(), "Event name and user ID are required");
}

#[tokio::test]
async fn delete_event_removes_all_users() {
    let ops = ops_with_document(r#"{"expo": {"a": [[0.1]], "b": [[0.2]]}, "fair": {"c": [[0.3]]}}"#);

    let deleted = ops.delete_event("expo").await.unwrap();
    assert_eq!(deleted.user_count, 2);
    assert!(ops.list_users("expo").await.users.is_empty());
    assert_eq!(ops.list_events().await.events.len(), 1);
}

#[tokio::test]
async fn event_with_no_users_is_neither_listed_nor_deletable() {
    let ops = ops_with_document(r#"{"expo": {}, "fair": {"c": [[0.3]]}}"#);

    let events = ops.list_events().await.events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_name, "fair");

    let err = ops.delete_event("expo").await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));
    assert_eq!(err.to_string(), "Event 'expo' not found");
}

// =============================================================================
// Storage behavior
// =============================================================================

#[tokio::test]
async fn last_write_wins_between_racing_enrollments() {
    let cell = MemoryBlobTransport::new();
    let writer_a = ops_over(&cell);
    let writer_b = ops_over(&cell);

    // A loads, B loads, A saves, B saves.
    let mut snapshot_a = writer_a.store().load().await;
    let mut snapshot_b = writer_b.store().load().await;
    snapshot_a.append_embedding("expo", "alice", emb(&[0.1, 0.2]));
    writer_a.store().save(&snapshot_a).await.unwrap();
    snapshot_b.append_embedding("expo", "bob", emb(&[0.3, 0.4]));
    writer_b.store().save(&snapshot_b).await.unwrap();

    assert_eq!(writer_a.list_users("expo").await.users, ["bob"]);
}

#[tokio::test]
async fn write_failure_is_reported_and_nothing_applies() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("occupied");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let ops = RegistryOps::new(
        EmbeddingStore::new(BlobTransport::LocalFile(FileBlobTransport::new(
            &blocker.join("embeddings.json"),
        ))),
        MatchEngine::default(),
    );

    let err = ops
        .enroll_user("expo", "alice", emb(&[0.1]))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Storage { .. }));
    assert!(err.to_string().starts_with("Failed to add user to event"));
    assert!(ops.list_events().await.events.is_empty());
}

#[tokio::test]
async fn local_file_registry_survives_a_fresh_instance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("embeddings.json");
    let open = || {
        RegistryOps::new(
            EmbeddingStore::new(BlobTransport::LocalFile(FileBlobTransport::new(&path))),
            MatchEngine::default(),
        )
    };

    open()
        .enroll_user("expo", "alice", emb(&[0.4, 0.4]))
        .await
        .unwrap();

    let verdict = open().verify_user("expo", &emb(&[0.4, 0.4])).await.unwrap();
    assert_eq!(verdict.username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn malformed_document_reads_as_empty() {
    let ops = ops_with_document("{not json");

    assert!(ops.list_events().await.events.is_empty());
    let snapshot = ops.raw_registry().await;
    assert!(snapshot.registry.is_empty());
    assert!(matches!(snapshot.source, SnapshotSource::Malformed(_)));
}

#[tokio::test]
async fn enrollment_keeps_events_with_unreadable_users() {
    let cell = MemoryBlobTransport::with_document(
        br#"{"gala":{"carol":[[0.3,0.3]],"dave":[[0.5,0.5]]},"expo":{"alice":5}}"#.to_vec(),
    );
    let ops = ops_over(&cell);

    ops.enroll_user("fair", "erin", emb(&[0.1, 0.1]))
        .await
        .unwrap();

    let stored: serde_json::Value =
        serde_json::from_slice(&cell.document().await.unwrap()).unwrap();
    assert_eq!(
        stored,
        serde_json::json!({
            "gala": {"carol": [[0.3, 0.3]], "dave": [[0.5, 0.5]]},
            "expo": {"alice": 5},
            "fair": {"erin": [[0.1, 0.1]]},
        })
    );
}

#[tokio::test]
async fn unreadable_user_is_skipped_during_verification() {
    let ops = ops_with_document(r#"{"gala": {"alice": 5, "zoe": null, "carol": [[0.3, 0.3]]}}"#);

    let verdict = ops.verify_user("gala", &emb(&[0.3, 0.3])).await.unwrap();
    assert!(verdict.flag);
    assert_eq!(verdict.username.as_deref(), Some("carol"));
    assert_eq!(ops.list_users("gala").await.users, ["alice", "zoe", "carol"]);
}

#[tokio::test]
async fn raw_registry_reports_provenance() {
    let empty = ops_over(&MemoryBlobTransport::new()).raw_registry().await;
    assert_eq!(empty.source, SnapshotSource::Missing(AbsentReason::NotFound));

    let loaded = ops_with_document(r#"{"expo": {"alice": [[0.1]]}}"#)
        .raw_registry()
        .await;
    assert_eq!(loaded.source, SnapshotSource::Document);
    assert!(loaded.registry.contains_event("expo"));
}

// =============================================================================
// Wire shape
// =============================================================================

#[tokio::test]
async fn operation_results_flatten_into_status_bodies() {
    let ops = ops_over(&MemoryBlobTransport::new());

    let enrolled = OpResponse::from_result(ops.enroll_user("expo", "alice", emb(&[0.1])).await);
    let json = serde_json::to_value(&enrolled).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(
        json["message"],
        "User 'alice' successfully added to event 'expo'"
    );
    assert_eq!(json["embedding_count"], 1);

    let missing = OpResponse::from_result(ops.delete_event("ghost").await);
    let json = serde_json::to_value(&missing).unwrap();
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "Event 'ghost' not found");
    assert!(json.get("user_count").is_none());
}

#[tokio::test]
async fn verdict_serializes_with_established_field_names() {
    let ops = ops_with_document(r#"{"expo": {"alice": [[0.0, 0.0]]}}"#);

    let verdict = ops.verify_user("expo", &emb(&[0.0, 0.0])).await.unwrap();
    let json = serde_json::to_value(&verdict).unwrap();
    assert_eq!(json["flag"], true);
    assert_eq!(json["username"], "alice");
    assert_eq!(json["confidence"], 100.0);
    assert_eq!(json["user_in_system"], true);
    assert_eq!(json["face_detected"], true);
}
