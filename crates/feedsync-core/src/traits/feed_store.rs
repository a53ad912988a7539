// # Feed Store Trait
//
// Defines the interface of the storage collaborator.
//
// ## Purpose
//
// The feed store holds the published feed: one document per entity plus
// the manifest and the hash index. The engine reads prior state from it
// at the start of a run and hands it finished documents at the end.
//
// ## Write Ordering
//
// 1. `stage_entity()` for every document that must be (re)written
// 2. `commit()` exactly once, after all documents are staged
// 3. `discard_staged()` instead of `commit()` when the run fails
//
// Staged documents are invisible to readers until `commit()`. A failure
// at step 1 therefore leaves every published file in place, and
// consumers never see an index that disagrees with the documents.
//
// ## Implementations
//
// - Directory-based: `FileFeedStore`
// - In-memory: `MemoryFeedStore`

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::model::{Entity, HashIndex, Manifest};

/// Trait for storage collaborators
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently, although the engine
/// assumes a single synchronization pass per output location at a time.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Load the prior manifest
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Manifest))`: Prior state exists
    /// - `Ok(None)`: No manifest yet (cold start)
    /// - `Err(Error::CorruptManifest)`: A manifest exists but cannot be read or parsed
    async fn load_manifest(&self) -> Result<Option<Manifest>>;

    /// Load one entity document
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Entity))`: The document exists and parsed
    /// - `Ok(None)`: No document for `uuid`
    /// - `Err(Error)`: The document exists but is unreadable
    async fn load_entity(&self, uuid: &Uuid) -> Result<Option<Entity>>;

    /// Write one entity document to the staging area
    ///
    /// The published document (if any) is unchanged until [`commit`](Self::commit).
    async fn stage_entity(&self, entity: &Entity) -> Result<()>;

    /// Publish every staged document, then replace the manifest and the hash index
    ///
    /// Called once per run, after every document has been staged.
    async fn commit(&self, manifest: &Manifest, hashes: &HashIndex) -> Result<()>;

    /// Drop every staged document without publishing it
    async fn discard_staged(&self) -> Result<()>;

    /// Uuids of every entity document held, live or retired
    async fn list_documents(&self) -> Result<Vec<Uuid>>;
}

/// Helper trait for constructing feed stores from configuration
#[async_trait]
pub trait FeedStoreFactory: Send + Sync {
    async fn create(&self, config: &StoreConfig) -> Result<Box<dyn FeedStore>>;
}
