//! Entity store
//!
//! In-memory view of the previous run's published entities, indexed by
//! identity key and by uuid, plus the retired documents still on disk so a
//! returning organization keeps its uuid.

use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{Entity, IdentityKey};
use crate::traits::FeedStore;

/// Prior published state
///
/// Identity keys are recomputed from each loaded document's source fields
/// rather than trusted from storage.
#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    by_key: HashMap<IdentityKey, Uuid>,
    by_uuid: HashMap<Uuid, Entity>,
    /// Documents kept on disk but absent from the manifest
    retained: HashMap<IdentityKey, Entity>,
}

impl EntityStore {
    /// An empty store (cold start)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every entity listed in the prior manifest, then index the
    /// retired documents the store still holds
    ///
    /// # Errors
    ///
    /// - `CorruptManifest`: the manifest exists but cannot be parsed
    /// - `EntityStore`: a document is missing, unreadable, carries a
    ///   different uuid than it is stored under, or two live documents share
    ///   an identity key
    ///
    /// Each of these aborts the run: treating them as "no prior entity"
    /// would mint duplicate entities for organizations already published.
    pub async fn load(store: &dyn FeedStore) -> Result<Self> {
        let manifest = store.load_manifest().await?;
        if manifest.is_none() {
            debug!("No prior manifest, starting cold");
        }
        let manifest = manifest.unwrap_or_default();

        let mut entities = Vec::with_capacity(manifest.len());
        for uuid in manifest.uuids() {
            let entity = Self::load_document(store, uuid).await?.ok_or_else(|| {
                Error::entity_store(format!(
                    "Manifest lists entity {} but its document is missing",
                    uuid
                ))
            })?;
            entities.push(entity);
        }

        let documents = store
            .list_documents()
            .await
            .map_err(|e| Error::entity_store(format!("Failed to list documents: {}", e)))?;
        let live: HashSet<&Uuid> = manifest.uuids().collect();
        let mut retired = Vec::new();
        for uuid in documents {
            if live.contains(&uuid) {
                continue;
            }
            if let Some(entity) = Self::load_document(store, &uuid).await? {
                retired.push(entity);
            }
        }
        let loaded = Self::from_entities(entities)?.with_retained(retired);

        debug!(
            "Loaded {} prior entities, {} retired",
            loaded.len(),
            loaded.retained.len()
        );
        Ok(loaded)
    }

    async fn load_document(store: &dyn FeedStore, uuid: &Uuid) -> Result<Option<Entity>> {
        let entity = store
            .load_entity(uuid)
            .await
            .map_err(|e| Error::entity_store(format!("Failed to load entity {}: {}", uuid, e)))?;

        match entity {
            Some(entity) if &entity.uuid != uuid => Err(Error::entity_store(format!(
                "Document for {} declares uuid {}",
                uuid, entity.uuid
            ))),
            other => Ok(other),
        }
    }

    /// Build an index over already loaded entities
    pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Result<Self> {
        let mut store = Self::empty();
        for entity in entities {
            let key = entity.identity_key();
            if let Some(existing) = store.by_key.get(&key) {
                return Err(Error::entity_store(format!(
                    "Entities {} and {} share identity {}",
                    existing, entity.uuid, key
                )));
            }
            store.by_key.insert(key, entity.uuid);
            store.by_uuid.insert(entity.uuid, entity);
        }
        Ok(store)
    }

    /// Index retired entities by identity key
    ///
    /// A key that is live is skipped. When several retired documents share
    /// a key, the most recently changed one wins.
    pub fn with_retained(mut self, entities: impl IntoIterator<Item = Entity>) -> Self {
        for entity in entities {
            let key = entity.identity_key();
            if self.by_key.contains_key(&key) {
                debug!("Retired entity {} shadowed by live {}", entity.uuid, key);
                continue;
            }
            match self.retained.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(entity);
                }
                Entry::Occupied(mut slot) => {
                    warn!(
                        "Retired entities {} and {} share identity {}",
                        slot.get().uuid,
                        entity.uuid,
                        slot.key()
                    );
                    if entity.timestamp > slot.get().timestamp {
                        slot.insert(entity);
                    }
                }
            }
        }
        self
    }

    /// Look up the live entity for an identity key
    pub fn get(&self, key: &IdentityKey) -> Option<&Entity> {
        self.by_key.get(key).and_then(|uuid| self.by_uuid.get(uuid))
    }

    /// Look up a retired entity for an identity key
    pub fn get_retained(&self, key: &IdentityKey) -> Option<&Entity> {
        self.retained.get(key)
    }

    /// Uuids of the live entities
    pub fn uuids(&self) -> impl Iterator<Item = &Uuid> {
        self.by_uuid.keys()
    }

    pub fn len(&self) -> usize {
        self.by_uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uuid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeSet, Classification, Organisation, SourceIdentity};
    use crate::storage::MemoryFeedStore;
    use crate::model::{HashIndex, Manifest, ManifestEntry};
    use crate::traits::FeedStore;

    fn entity(org: &str, registrant_id: &str) -> Entity {
        let ts = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        Entity {
            uuid: Uuid::new_v4(),
            title: Entity::title_for(org, registrant_id),
            date: ts.date_naive(),
            timestamp: ts,
            published: false,
            classification: Classification::default(),
            orgc: Organisation {
                name: "CERT".to_string(),
                uuid: Uuid::nil(),
            },
            source: SourceIdentity {
                org: org.to_string(),
                registrant_id: registrant_id.to_string(),
            },
            attributes: AttributeSet::new(),
        }
    }

    #[tokio::test]
    async fn missing_manifest_is_cold_start() {
        let store = MemoryFeedStore::new();
        let loaded = EntityStore::load(&store).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn loads_listed_entities_by_identity() {
        let store = MemoryFeedStore::new();
        let a = entity("Alpha", "1");
        let b = entity("Beta", "2");
        let mut manifest = Manifest::new();
        for e in [&a, &b] {
            store.stage_entity(e).await.unwrap();
            manifest.insert(e.uuid, ManifestEntry::from(e));
        }
        store
            .commit(&manifest, &HashIndex::new())
            .await
            .unwrap();

        let loaded = EntityStore::load(&store).await.unwrap();
        assert_eq!(loaded.len(), 2);
        let key = IdentityKey::new("Beta", "2");
        assert_eq!(loaded.get(&key).map(|e| e.uuid), Some(b.uuid));
    }

    #[tokio::test]
    async fn retired_documents_are_indexed_apart_from_live_ones() {
        let store = MemoryFeedStore::new();
        let live = entity("Alpha", "1");
        let retired = entity("Gone", "9");
        store.stage_entity(&live).await.unwrap();
        store.stage_entity(&retired).await.unwrap();

        let mut manifest = Manifest::new();
        manifest.insert(live.uuid, ManifestEntry::from(&live));
        store
            .commit(&manifest, &HashIndex::new())
            .await
            .unwrap();

        let loaded = EntityStore::load(&store).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.uuids().collect::<Vec<_>>(), vec![&live.uuid]);
        let key = IdentityKey::new("Gone", "9");
        assert!(loaded.get(&key).is_none());
        assert_eq!(loaded.get_retained(&key).map(|e| e.uuid), Some(retired.uuid));
    }

    #[tokio::test]
    async fn documents_missing_from_empty_manifest_are_retained() {
        let store = MemoryFeedStore::new();
        let orphan = entity("Alpha", "1");
        store.stage_entity(&orphan).await.unwrap();
        store.commit(&Manifest::new(), &HashIndex::new()).await.unwrap();

        let loaded = EntityStore::load(&store).await.unwrap();
        assert!(loaded.is_empty());
        assert!(loaded.get_retained(&IdentityKey::new("Alpha", "1")).is_some());
    }

    #[test]
    fn newest_retired_duplicate_wins() {
        let older = entity("Alpha", "1");
        let mut newer = entity("Alpha", "1");
        newer.timestamp = older.timestamp + chrono::Duration::days(1);

        let store = EntityStore::empty().with_retained([older, newer.clone()]);
        assert_eq!(
            store.get_retained(&IdentityKey::new("Alpha", "1")).map(|e| e.uuid),
            Some(newer.uuid)
        );
    }

    #[tokio::test]
    async fn missing_listed_document_aborts() {
        let store = MemoryFeedStore::new();
        let ghost = entity("Ghost", "0");
        let mut manifest = Manifest::new();
        manifest.insert(ghost.uuid, ManifestEntry::from(&ghost));
        store
            .commit(&manifest, &HashIndex::new())
            .await
            .unwrap();

        let err = EntityStore::load(&store).await.unwrap_err();
        assert!(matches!(err, Error::EntityStore(_)));
    }

    #[tokio::test]
    async fn corrupt_manifest_aborts() {
        let store = MemoryFeedStore::new();
        store.put_raw_manifest("{\"truncated\":").await;

        let err = EntityStore::load(&store).await.unwrap_err();
        assert!(matches!(err, Error::CorruptManifest(_)));
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let err = EntityStore::from_entities([entity("Alpha", "1"), entity("Alpha", "1")])
            .unwrap_err();
        assert!(matches!(err, Error::EntityStore(_)));
    }
}
