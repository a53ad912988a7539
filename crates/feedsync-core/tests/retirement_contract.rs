//! Contract Test: Cold Start & Retirement
//!
//! Constraints verified:
//! - With no prior manifest every record becomes a new, changed entity
//! - An entity missing from the input leaves the manifest and hash index
//! - A retired entity's document stays on disk
//! - A retired entity that is listed again keeps its uuid
//! - Duplicate lines for one identity collapse into one entity

mod common;

use common::*;
use feedsync_core::{MemoryFeedStore, SyncEvent};

const REGISTRY: &[&str] = &[
    "64500|Alpha Networks|11111111000101|192.0.2.0/24",
    "64501|Beta Telecom|22222222000102|198.51.100.0/24|203.0.113.0/24",
];

#[tokio::test]
async fn cold_start_creates_every_entity() {
    let store = MemoryFeedStore::new();

    let (report, events) =
        run_pass_with(Box::new(store.clone()), REGISTRY, T1, minimal_config())
            .await
            .unwrap();

    assert_eq!(report.created, 2);
    assert_eq!(report.documents_written, 2);
    assert_eq!(report.hash_entries, (1 + 2) + (1 + 3));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SyncEvent::EntityCreated { .. }))
            .count(),
        2
    );
    assert!(matches!(events.first(), Some(SyncEvent::Started { .. })));
    assert!(matches!(events.last(), Some(SyncEvent::Completed { .. })));

    for entity in live_entities(&store).await {
        assert_eq!(entity.timestamp.timestamp(), T1);
        assert_eq!(entity.orgc.name, "CERT.example");
        assert!(!entity.published);
    }
}

#[tokio::test]
async fn absent_entity_is_retired_but_kept_on_disk() {
    let store = MemoryFeedStore::new();
    run_pass(&store, REGISTRY, T1).await.unwrap();
    let beta = entity_titled(&store, "Beta Telecom 22222222000102").await;
    let beta_doc = store.document(&beta.uuid).await;

    let (report, events) =
        run_pass_with(Box::new(store.clone()), &REGISTRY[..1], T2, minimal_config())
            .await
            .unwrap();

    assert_eq!(report.retired, 1);
    assert!(events.contains(&SyncEvent::EntityRetired { uuid: beta.uuid }));

    let manifest = store.manifest_json().await.unwrap();
    assert!(!manifest.contains(&beta.uuid.to_string()));
    let hashes = store.hashes_csv().await.unwrap();
    assert!(!hashes.contains(&beta.uuid.to_string()));
    assert_eq!(hashes.lines().count(), 3);

    assert_eq!(store.document(&beta.uuid).await, beta_doc);
    assert_eq!(store.document_count().await, 2);
}

#[tokio::test]
async fn empty_input_retires_everything() {
    let store = MemoryFeedStore::new();
    run_pass(&store, REGISTRY, T1).await.unwrap();

    let report = run_pass(&store, &[], T2).await.unwrap();

    assert_eq!(report.retired, 2);
    assert_eq!(store.manifest_json().await.as_deref(), Some("{}"));
    assert_eq!(store.hashes_csv().await.as_deref(), Some(""));
    assert_eq!(store.document_count().await, 2);
}

#[tokio::test]
async fn relisted_entity_keeps_its_uuid() {
    let store = MemoryFeedStore::new();
    run_pass(&store, &REGISTRY[..1], T1).await.unwrap();
    let first = entity_titled(&store, "Alpha Networks 11111111000101").await;

    let report = run_pass(&store, &[], T2).await.unwrap();
    assert_eq!(report.retired, 1);

    let (report, events) =
        run_pass_with(Box::new(store.clone()), &REGISTRY[..1], T3, minimal_config())
            .await
            .unwrap();

    assert_eq!(report.created, 0);
    assert_eq!(report.revived, 1);
    assert_eq!(report.documents_written, 1);
    assert!(events.contains(&SyncEvent::EntityRevived { uuid: first.uuid }));

    let again = entity_titled(&store, "Alpha Networks 11111111000101").await;
    assert_eq!(again.uuid, first.uuid);
    assert_eq!(again.timestamp.timestamp(), T3);
    assert_eq!(again.attributes, first.attributes);
    assert_eq!(store.document_count().await, 1);
    assert!(store.hashes_csv().await.unwrap().contains(&first.uuid.to_string()));
}

#[tokio::test]
async fn relisted_entity_picks_up_new_blocks() {
    let store = MemoryFeedStore::new();
    run_pass(&store, REGISTRY, T1).await.unwrap();
    let beta = entity_titled(&store, "Beta Telecom 22222222000102").await;
    run_pass(&store, &REGISTRY[..1], T2).await.unwrap();

    let relisted = [
        REGISTRY[0],
        "64501|Beta Telecom|22222222000102|198.51.100.0/24|100.64.0.0/10",
    ];
    let report = run_pass(&store, &relisted, T3).await.unwrap();

    assert_eq!(report.revived, 1);
    assert_eq!(report.unchanged, 1);
    let again = entity_titled(&store, "Beta Telecom 22222222000102").await;
    assert_eq!(again.uuid, beta.uuid);
    assert_eq!(again.attributes.cidr_values().count(), 2);
    assert_eq!(store.document_count().await, 2);
}

#[tokio::test]
async fn already_retired_entity_is_not_retired_twice() {
    let store = MemoryFeedStore::new();
    run_pass(&store, REGISTRY, T1).await.unwrap();
    run_pass(&store, &[], T2).await.unwrap();

    let report = run_pass(&store, &[], T3).await.unwrap();

    assert_eq!(report.retired, 0);
    assert!(!report.has_changes());
}

#[tokio::test]
async fn duplicate_lines_merge_into_one_entity() {
    let store = MemoryFeedStore::new();
    let lines = [
        "64500|Alpha Networks|11111111000101|192.0.2.0/24",
        "64500| Alpha Networks |11111111000101|198.51.100.0/24",
    ];

    let report = run_pass(&store, &lines, T1).await.unwrap();

    assert_eq!(report.created, 1);
    let alpha = entity_titled(&store, "Alpha Networks 11111111000101").await;
    assert_eq!(alpha.attributes.len(), 3);
}
