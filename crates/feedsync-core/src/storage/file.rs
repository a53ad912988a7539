// # File Feed Store
//
// Directory-based implementation of FeedStore.
//
// ## Purpose
//
// Publishes the feed as a directory consumers can serve as-is:
//
// ```text
// <dir>/
//   <uuid>.json     one document per entity, live or retired
//   manifest.json   live entities only
//   hashes.csv      hash,uuid lines for live entities
// ```
//
// ## Crash Safety
//
// - Staging: documents are written to `<uuid>.tmp`, flushed, and only
//   renamed over `<uuid>.json` by `commit()`
// - Commit: both index files are fully written to `.tmp` siblings before
//   any rename, then documents, `hashes.csv` and finally `manifest.json`
//   are renamed into place
// - Crash window: a crash during the renames can leave new documents or a
//   new `hashes.csv` next to the previous `manifest.json`. The next run
//   rebuilds both indexes from the documents on disk
// - Backup: the previous manifest and hash index are kept as
//   `manifest.backup` / `hashes.backup`
// - Corruption: an unparsable manifest is reported, never silently
//   replaced (the caller aborts the run)

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::model::{Entity, HashIndex, Manifest};
use crate::traits::{FeedStore, FeedStoreFactory};

const MANIFEST_FILE: &str = "manifest.json";
const HASHES_FILE: &str = "hashes.csv";
const DOCUMENT_EXTENSION: &str = "json";

/// Feed store backed by an output directory
///
/// # Example
///
/// ```rust,no_run
/// use feedsync_core::storage::FileFeedStore;
/// use feedsync_core::traits::FeedStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileFeedStore::new("/var/lib/feedsync/feed").await?;
///     let manifest = store.load_manifest().await?;
///     println!("live entities: {}", manifest.map(|m| m.len()).unwrap_or(0));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileFeedStore {
    dir: PathBuf,

    /// Documents written to `<uuid>.tmp` and not yet committed
    staged: Arc<Mutex<BTreeSet<Uuid>>>,
}

impl FileFeedStore {
    /// Open a feed directory, creating it if needed
    pub async fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.exists() {
            fs::create_dir_all(&dir).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create output directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(Self {
            dir,
            staged: Arc::new(Mutex::new(BTreeSet::new())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `uuid`
    pub fn document_path(&self, uuid: &Uuid) -> PathBuf {
        self.dir
            .join(format!("{}.{}", uuid.hyphenated(), DOCUMENT_EXTENSION))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    pub fn hashes_path(&self) -> PathBuf {
        self.dir.join(HASHES_FILE)
    }

    /// Read a file, mapping "not found" to `None`
    async fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write `content` to the `.tmp` sibling of `path` and flush it
    async fn write_temp(path: &Path, content: &str) -> Result<PathBuf> {
        let temp_path = Self::temp_path(path);
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to create temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.write_all(content.as_bytes()).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to write to temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.flush().await.map_err(|e| {
            Error::persistence(format!(
                "Failed to flush temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        Ok(temp_path)
    }

    async fn rename_into_place(temp_path: &Path, path: &Path) -> Result<()> {
        fs::rename(temp_path, path).await.map_err(|e| {
            Error::persistence(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })
    }

    /// Keep a copy of the current file before it is replaced
    ///
    /// A failed copy does not stop the commit; the live file is still
    /// replaced atomically.
    async fn backup(path: &Path) {
        if path.exists() {
            if let Err(e) = fs::copy(path, Self::backup_path(path)).await {
                tracing::error!("Failed to back up {}: {}", path.display(), e);
            }
        }
    }

    async fn remove_temp(path: &Path) -> Result<()> {
        match fs::remove_file(Self::temp_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::persistence(format!(
                "Failed to remove temp file for {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(path: &Path) -> PathBuf {
        let mut temp = path.to_path_buf();
        temp.set_extension("tmp");
        temp
    }

    /// Get path to backup file
    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl FeedStore for FileFeedStore {
    async fn load_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.manifest_path();
        let content = Self::read_optional(&path).await.map_err(|e| {
            Error::corrupt_manifest(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match content {
            None => {
                tracing::debug!("Manifest does not exist: {}", path.display());
                Ok(None)
            }
            Some(content) => Manifest::from_json(&content).map(Some).map_err(|e| {
                Error::corrupt_manifest(format!("{}: {}", path.display(), e))
            }),
        }
    }

    async fn load_entity(&self, uuid: &Uuid) -> Result<Option<Entity>> {
        let path = self.document_path(uuid);
        let content = Self::read_optional(&path).await.map_err(|e| {
            Error::entity_store(format!("Failed to read {}: {}", path.display(), e))
        })?;

        content
            .map(|content| {
                Entity::from_document(&content).map_err(|e| {
                    Error::entity_store(format!("Failed to parse {}: {}", path.display(), e))
                })
            })
            .transpose()
    }

    async fn stage_entity(&self, entity: &Entity) -> Result<()> {
        let document = entity.to_document()?;
        let path = self.document_path(&entity.uuid);
        self.staged.lock().await.insert(entity.uuid);
        Self::write_temp(&path, &document).await?;

        tracing::trace!("Entity staged for {}", path.display());
        Ok(())
    }

    async fn commit(&self, manifest: &Manifest, hashes: &HashIndex) -> Result<()> {
        let manifest_path = self.manifest_path();
        let hashes_path = self.hashes_path();

        let manifest_temp = Self::write_temp(&manifest_path, &manifest.to_json()?).await?;
        let hashes_temp = Self::write_temp(&hashes_path, &hashes.to_csv()).await?;

        Self::backup(&manifest_path).await;
        Self::backup(&hashes_path).await;

        let mut staged = self.staged.lock().await;
        while let Some(uuid) = staged.pop_first() {
            let path = self.document_path(&uuid);
            Self::rename_into_place(&Self::temp_path(&path), &path).await?;
        }
        drop(staged);

        // The manifest goes last: it is what consumers poll
        Self::rename_into_place(&hashes_temp, &hashes_path).await?;
        Self::rename_into_place(&manifest_temp, &manifest_path).await?;

        tracing::trace!("Feed committed to {}", self.dir.display());
        Ok(())
    }

    async fn discard_staged(&self) -> Result<()> {
        let staged = std::mem::take(&mut *self.staged.lock().await);
        for uuid in &staged {
            Self::remove_temp(&self.document_path(uuid)).await?;
        }
        Self::remove_temp(&self.manifest_path()).await?;
        Self::remove_temp(&self.hashes_path()).await?;

        tracing::debug!("Discarded {} staged document(s)", staged.len());
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<Uuid>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut uuids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            if let Some(uuid) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            {
                uuids.push(uuid);
            }
        }
        uuids.sort();
        Ok(uuids)
    }
}

/// Factory for directory-backed feed stores
pub struct FileFeedStoreFactory;

#[async_trait]
impl FeedStoreFactory for FileFeedStoreFactory {
    async fn create(&self, config: &StoreConfig) -> Result<Box<dyn FeedStore>> {
        match config {
            StoreConfig::File { dir } => Ok(Box::new(FileFeedStore::new(dir).await?)),
            _ => Err(Error::config("Invalid config for file feed store")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Attribute, AttributeSet, Classification, ManifestEntry, Organisation, SourceIdentity,
    };
    use chrono::DateTime;
    use tempfile::tempdir;

    fn entity() -> Entity {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut attributes = AttributeSet::new();
        attributes.set_asn(Attribute::asn("64500", ts));
        attributes.insert_cidr(Attribute::cidr("192.0.2.0/24", ts));
        Entity {
            uuid: Uuid::new_v4(),
            title: "Alpha 1".to_string(),
            date: ts.date_naive(),
            timestamp: ts,
            published: false,
            classification: Classification::default(),
            orgc: Organisation {
                name: "CERT".to_string(),
                uuid: Uuid::nil(),
            },
            source: SourceIdentity {
                org: "Alpha".to_string(),
                registrant_id: "1".to_string(),
            },
            attributes,
        }
    }

    #[tokio::test]
    async fn test_file_store_basic() {
        let dir = tempdir().unwrap();
        let store = FileFeedStore::new(dir.path().join("feed")).await.unwrap();

        // Initially empty
        assert!(store.load_manifest().await.unwrap().is_none());
        assert!(store.list_documents().await.unwrap().is_empty());

        let entity = entity();
        store.stage_entity(&entity).await.unwrap();
        assert!(store.load_entity(&entity.uuid).await.unwrap().is_none());
        assert!(store.list_documents().await.unwrap().is_empty());

        let mut manifest = Manifest::new();
        manifest.insert(entity.uuid, ManifestEntry::from(&entity));
        let mut hashes = HashIndex::new();
        hashes.push(entity.content_hash().unwrap(), entity.uuid);
        store.commit(&manifest, &hashes).await.unwrap();

        // Load new instance and verify persistence
        let store2 = FileFeedStore::new(store.dir()).await.unwrap();
        assert_eq!(store2.load_manifest().await.unwrap(), Some(manifest));
        assert_eq!(
            store2.load_entity(&entity.uuid).await.unwrap(),
            Some(entity.clone())
        );
        assert_eq!(store2.list_documents().await.unwrap(), vec![entity.uuid]);

        let csv = fs::read_to_string(store.hashes_path()).await.unwrap();
        assert_eq!(HashIndex::from_csv(&csv).unwrap(), hashes);
    }

    #[tokio::test]
    async fn test_file_store_corrupt_manifest_is_reported() {
        let dir = tempdir().unwrap();
        let store = FileFeedStore::new(dir.path()).await.unwrap();
        fs::write(store.manifest_path(), b"corrupted json data")
            .await
            .unwrap();

        let err = store.load_manifest().await.unwrap_err();
        assert!(matches!(err, Error::CorruptManifest(_)));

        // The corrupt file is left for the operator to inspect
        assert!(store.manifest_path().exists());
    }

    #[tokio::test]
    async fn test_file_store_keeps_backup_of_previous_indexes() {
        let dir = tempdir().unwrap();
        let store = FileFeedStore::new(dir.path()).await.unwrap();

        let entity = entity();
        let mut first = Manifest::new();
        first.insert(entity.uuid, ManifestEntry::from(&entity));
        store.commit(&first, &HashIndex::new()).await.unwrap();
        store
            .commit(&Manifest::new(), &HashIndex::new())
            .await
            .unwrap();

        let backup = fs::read_to_string(FileFeedStore::backup_path(&store.manifest_path()))
            .await
            .unwrap();
        assert_eq!(Manifest::from_json(&backup).unwrap(), first);
        assert!(!FileFeedStore::temp_path(&store.manifest_path()).exists());
    }

    #[tokio::test]
    async fn test_file_store_atomic_rewrite() {
        let dir = tempdir().unwrap();
        let store = FileFeedStore::new(dir.path()).await.unwrap();

        let mut entity = entity();
        for i in 0..10 {
            entity.title = format!("Alpha {}", i);
            store.stage_entity(&entity).await.unwrap();
        }
        store.commit(&Manifest::new(), &HashIndex::new()).await.unwrap();

        let loaded = store.load_entity(&entity.uuid).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Alpha 9");
        assert!(!FileFeedStore::temp_path(&store.document_path(&entity.uuid)).exists());
    }

    #[tokio::test]
    async fn test_file_store_discard_keeps_published_document() {
        let dir = tempdir().unwrap();
        let store = FileFeedStore::new(dir.path()).await.unwrap();

        let mut entity = entity();
        store.stage_entity(&entity).await.unwrap();
        store.commit(&Manifest::new(), &HashIndex::new()).await.unwrap();
        let published = fs::read(store.document_path(&entity.uuid)).await.unwrap();

        entity.title = "Alpha 2".to_string();
        store.stage_entity(&entity).await.unwrap();
        store.discard_staged().await.unwrap();

        assert_eq!(
            fs::read(store.document_path(&entity.uuid)).await.unwrap(),
            published
        );
        assert!(!FileFeedStore::temp_path(&store.document_path(&entity.uuid)).exists());

        // Nothing left to publish
        store.commit(&Manifest::new(), &HashIndex::new()).await.unwrap();
        let loaded = store.load_entity(&entity.uuid).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Alpha 1");
    }

    #[tokio::test]
    async fn test_file_store_missing_document_is_none() {
        let dir = tempdir().unwrap();
        let store = FileFeedStore::new(dir.path()).await.unwrap();
        assert!(store.load_entity(&Uuid::new_v4()).await.unwrap().is_none());
    }
}
