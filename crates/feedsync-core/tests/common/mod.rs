//! Test doubles and common utilities for feed contract tests
//!
//! Every contract test drives the real engine against a shared
//! [`MemoryFeedStore`], so a "run" is one engine built around a fresh
//! source and a fixed clock.

#![allow(dead_code)]

use async_trait::async_trait;
use feedsync_core::config::{FeedConfig, OrganisationConfig, PublishMode, SourceConfig, StoreConfig};
use feedsync_core::error::{Error, Result};
use feedsync_core::model::{Entity, HashIndex, Manifest};
use feedsync_core::traits::{FeedStore, FixedClock, RecordSource};
use feedsync_core::{FeedEngine, MemoryFeedStore, StaticRecordSource, SyncEvent, SyncReport};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use uuid::Uuid;

pub const ORG_UUID: &str = "5f6e2d5c-9a3b-4c1e-8f7a-2b4d6c8e0a1f";

/// First run's timestamp
pub const T1: i64 = 1_700_000_000;
/// A later run
pub const T2: i64 = T1 + 86_400;
pub const T3: i64 = T2 + 86_400;

/// Minimal valid configuration
pub fn minimal_config() -> FeedConfig {
    FeedConfig::new(
        SourceConfig::File {
            path: "registry.txt".to_string(),
        },
        StoreConfig::Memory,
        OrganisationConfig::new("CERT.example", ORG_UUID),
    )
}

pub fn config_with_mode(mode: PublishMode) -> FeedConfig {
    let mut config = minimal_config();
    config.publish.mode = mode;
    config
}

/// Run one pass over `lines` at `at` against `store`
pub async fn run_pass(
    store: &MemoryFeedStore,
    lines: &[&str],
    at: i64,
) -> Result<SyncReport> {
    run_pass_with(Box::new(store.clone()), lines, at, minimal_config())
        .await
        .map(|(report, _)| report)
}

/// Run one pass with an arbitrary store and configuration, collecting events
pub async fn run_pass_with(
    store: Box<dyn FeedStore>,
    lines: &[&str],
    at: i64,
    config: FeedConfig,
) -> Result<(SyncReport, Vec<SyncEvent>)> {
    let source = StaticRecordSource::new(lines.iter().copied());
    let (engine, events) = FeedEngine::new(
        Box::new(source),
        store,
        Box::new(FixedClock::from_timestamp(at)),
        config,
    )?;
    let report = engine.run().await?;
    drop(engine);
    Ok((report, drain(events)))
}

fn drain(mut rx: mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Load every live entity of the store's current manifest
pub async fn live_entities(store: &MemoryFeedStore) -> Vec<Entity> {
    let manifest = store
        .load_manifest()
        .await
        .expect("manifest readable")
        .unwrap_or_default();
    let mut entities = Vec::new();
    for uuid in manifest.uuids() {
        entities.push(
            store
                .load_entity(uuid)
                .await
                .expect("document readable")
                .expect("document present"),
        );
    }
    entities
}

/// Find the live entity titled `title`
pub async fn entity_titled(store: &MemoryFeedStore, title: &str) -> Entity {
    live_entities(store)
        .await
        .into_iter()
        .find(|e| e.title == title)
        .unwrap_or_else(|| panic!("no live entity titled {title}"))
}

/// Snapshot of every byte the store holds
pub async fn snapshot(store: &MemoryFeedStore) -> (Option<String>, Option<String>, Vec<(Uuid, String)>) {
    let mut documents = Vec::new();
    for uuid in store.list_documents().await.expect("listable") {
        let doc = store.document(&uuid).await.expect("listed document exists");
        documents.push((uuid, doc));
    }
    (store.manifest_json().await, store.hashes_csv().await, documents)
}

/// A record source whose fetch always fails
pub struct FailingSource;

#[async_trait]
impl RecordSource for FailingSource {
    async fn fetch_lines(&self) -> Result<Vec<String>> {
        Err(Error::source("registry unreachable"))
    }

    fn source_name(&self) -> &'static str {
        "failing"
    }
}

/// Wraps a [`MemoryFeedStore`] and fails selected writes
#[derive(Clone)]
pub struct FaultyFeedStore {
    inner: MemoryFeedStore,
    /// Documents staged before every further one fails
    stage_budget: Arc<AtomicUsize>,
    fail_commit: Arc<AtomicBool>,
    stage_calls: Arc<AtomicUsize>,
    commit_calls: Arc<AtomicUsize>,
    discard_calls: Arc<AtomicUsize>,
}

impl FaultyFeedStore {
    pub fn new(inner: MemoryFeedStore) -> Self {
        Self {
            inner,
            stage_budget: Arc::new(AtomicUsize::new(usize::MAX)),
            fail_commit: Arc::new(AtomicBool::new(false)),
            stage_calls: Arc::new(AtomicUsize::new(0)),
            commit_calls: Arc::new(AtomicUsize::new(0)),
            discard_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Allow `n` staged documents, then fail
    pub fn fail_documents_after(self, n: usize) -> Self {
        self.stage_budget.store(n, Ordering::SeqCst);
        self
    }

    pub fn fail_commit(self) -> Self {
        self.fail_commit.store(true, Ordering::SeqCst);
        self
    }

    pub fn stage_calls(&self) -> usize {
        self.stage_calls.load(Ordering::SeqCst)
    }

    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    pub fn discard_calls(&self) -> usize {
        self.discard_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedStore for FaultyFeedStore {
    async fn load_manifest(&self) -> Result<Option<Manifest>> {
        self.inner.load_manifest().await
    }

    async fn load_entity(&self, uuid: &Uuid) -> Result<Option<Entity>> {
        self.inner.load_entity(uuid).await
    }

    async fn stage_entity(&self, entity: &Entity) -> Result<()> {
        let call = self.stage_calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.stage_budget.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("disk full")));
        }
        self.inner.stage_entity(entity).await
    }

    async fn commit(&self, manifest: &Manifest, hashes: &HashIndex) -> Result<()> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("disk full")));
        }
        self.inner.commit(manifest, hashes).await
    }

    async fn discard_staged(&self) -> Result<()> {
        self.discard_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.discard_staged().await
    }

    async fn list_documents(&self) -> Result<Vec<Uuid>> {
        self.inner.list_documents().await
    }
}
