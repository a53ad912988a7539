//! Hash/manifest generator
//!
//! Computes per-entity digests and assembles the manifest and the hash
//! index. Digests are computed independently per entity (one slot each),
//! then assembled in uuid order, so the output does not depend on the
//! order records arrived in.

use uuid::Uuid;

use crate::error::Result;
use crate::model::{Entity, HashIndex, Manifest, ManifestEntry};

/// Hashes contributed by one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDigest {
    pub uuid: Uuid,
    /// SHA-256 of the canonical entity serialization
    pub content_hash: String,
    /// SHA-256 of each attribute value, in canonical attribute order
    pub attribute_hashes: Vec<String>,
    pub summary: ManifestEntry,
}

impl EntityDigest {
    pub fn compute(entity: &Entity) -> Result<Self> {
        Ok(Self {
            uuid: entity.uuid,
            content_hash: entity.content_hash()?,
            attribute_hashes: entity.attributes.iter().map(|a| a.value_hash()).collect(),
            summary: ManifestEntry::from(entity),
        })
    }
}

/// The two index files of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedIndex {
    pub manifest: Manifest,
    pub hashes: HashIndex,
}

impl FeedIndex {
    /// Build both indexes from the live entity set
    ///
    /// Every entity contributes exactly one manifest entry, one content
    /// hash line and one line per attribute.
    pub fn generate<'a>(entities: impl IntoIterator<Item = &'a Entity>) -> Result<Self> {
        let digests = entities
            .into_iter()
            .map(EntityDigest::compute)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::assemble(digests))
    }

    /// Assemble precomputed digests
    pub fn assemble(mut digests: Vec<EntityDigest>) -> Self {
        digests.sort_by(|a, b| a.uuid.cmp(&b.uuid));

        let mut index = FeedIndex::default();
        for digest in digests {
            index.hashes.push(digest.content_hash, digest.uuid);
            for hash in digest.attribute_hashes {
                index.hashes.push(hash, digest.uuid);
            }
            index.manifest.insert(digest.uuid, digest.summary);
        }
        index
    }
}
