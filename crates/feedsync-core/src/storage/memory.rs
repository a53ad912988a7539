// # Memory Feed Store
//
// In-memory implementation of FeedStore.
//
// ## Purpose
//
// Holds the serialized feed (documents, manifest, hash index) in memory,
// byte-for-byte as the file store would write it. Useful for tests and
// for embedding the engine where the caller ships the output elsewhere.
//
// ## Crash Behavior
//
// - All state is lost when the process exits
// - The next run against a fresh store is a cold start

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::model::{Entity, HashIndex, Manifest};
use crate::traits::{FeedStore, FeedStoreFactory};

#[derive(Debug, Default)]
struct MemoryFeed {
    documents: BTreeMap<Uuid, String>,
    /// Staged documents awaiting `commit()`
    pending: BTreeMap<Uuid, String>,
    manifest: Option<String>,
    hashes: Option<String>,
    document_writes: usize,
    index_commits: usize,
}

/// In-memory feed store
///
/// Cloning yields another handle to the same feed.
///
/// # Example
///
/// ```rust,no_run
/// use feedsync_core::storage::MemoryFeedStore;
/// use feedsync_core::traits::FeedStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryFeedStore::new();
///     assert!(store.load_manifest().await?.is_none());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFeedStore {
    inner: Arc<RwLock<MemoryFeed>>,
}

impl MemoryFeedStore {
    /// Create a new empty memory feed store
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialized document for `uuid`
    pub async fn document(&self, uuid: &Uuid) -> Option<String> {
        self.inner.read().await.documents.get(uuid).cloned()
    }

    /// Serialized manifest, if one was committed
    pub async fn manifest_json(&self) -> Option<String> {
        self.inner.read().await.manifest.clone()
    }

    /// Serialized hash index, if one was committed
    pub async fn hashes_csv(&self) -> Option<String> {
        self.inner.read().await.hashes.clone()
    }

    /// Number of documents held, live or retired
    pub async fn document_count(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    /// Number of staged documents not yet committed
    pub async fn pending_count(&self) -> usize {
        self.inner.read().await.pending.len()
    }

    /// Total documents published since creation
    pub async fn document_writes(&self) -> usize {
        self.inner.read().await.document_writes
    }

    /// Total index commits since creation
    pub async fn index_commits(&self) -> usize {
        self.inner.read().await.index_commits
    }

    /// Replace the manifest with arbitrary content
    pub async fn put_raw_manifest(&self, content: impl Into<String>) {
        self.inner.write().await.manifest = Some(content.into());
    }
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn load_manifest(&self) -> Result<Option<Manifest>> {
        let guard = self.inner.read().await;
        guard.manifest.as_deref().map(Manifest::from_json).transpose()
    }

    async fn load_entity(&self, uuid: &Uuid) -> Result<Option<Entity>> {
        let guard = self.inner.read().await;
        guard
            .documents
            .get(uuid)
            .map(|doc| Entity::from_document(doc))
            .transpose()
    }

    async fn stage_entity(&self, entity: &Entity) -> Result<()> {
        let document = entity.to_document()?;
        self.inner
            .write()
            .await
            .pending
            .insert(entity.uuid, document);
        Ok(())
    }

    async fn commit(&self, manifest: &Manifest, hashes: &HashIndex) -> Result<()> {
        let manifest = manifest.to_json()?;
        let hashes = hashes.to_csv();
        let mut guard = self.inner.write().await;
        let pending = std::mem::take(&mut guard.pending);
        guard.document_writes += pending.len();
        guard.documents.extend(pending);
        guard.manifest = Some(manifest);
        guard.hashes = Some(hashes);
        guard.index_commits += 1;
        Ok(())
    }

    async fn discard_staged(&self) -> Result<()> {
        self.inner.write().await.pending.clear();
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<Uuid>> {
        let guard = self.inner.read().await;
        Ok(guard.documents.keys().copied().collect())
    }
}

/// Factory for memory feed stores
pub struct MemoryFeedStoreFactory;

#[async_trait]
impl FeedStoreFactory for MemoryFeedStoreFactory {
    async fn create(&self, config: &StoreConfig) -> Result<Box<dyn FeedStore>> {
        match config {
            StoreConfig::Memory => Ok(Box::new(MemoryFeedStore::new())),
            _ => Err(Error::config("Invalid config for memory feed store")),
        }
    }
}
