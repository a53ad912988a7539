// # Index Files
//
// The manifest and the hash index are complete snapshots of the live
// entity set. Both are rebuilt from scratch every run and never merged
// with the previous run's copy.
//
// ## manifest.json
//
// ```json
// { "<uuid>": { "Orgc": {...}, "Tag": [], "info": "...", "date": "2026-10-19",
//               "timestamp": 1792368000, "analysis": 0, "threat_level_id": 1,
//               "published": false } }
// ```
//
// ## hashes.csv
//
// ```text
// <sha256>,<uuid>
// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::entity::{Entity, Organisation, Tag};
use crate::error::{Error, Result};

/// Summary of one live entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "Orgc")]
    pub orgc: Organisation,
    #[serde(rename = "Tag", default)]
    pub tags: Vec<Tag>,
    pub info: String,
    pub date: NaiveDate,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub analysis: u8,
    pub threat_level_id: u8,
    pub published: bool,
}

impl From<&Entity> for ManifestEntry {
    fn from(entity: &Entity) -> Self {
        Self {
            orgc: entity.orgc.clone(),
            tags: entity.classification.tags.clone(),
            info: entity.title.clone(),
            date: entity.date,
            timestamp: entity.timestamp,
            analysis: entity.classification.analysis,
            threat_level_id: entity.classification.threat_level_id,
            published: entity.published,
        }
    }
}

/// Mapping from entity uuid to summary, sorted by uuid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<Uuid, ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the summary for `uuid`
    pub fn insert(&mut self, uuid: Uuid, entry: ManifestEntry) -> Option<ManifestEntry> {
        self.entries.insert(uuid, entry)
    }

    pub fn get(&self, uuid: &Uuid) -> Option<&ManifestEntry> {
        self.entries.get(uuid)
    }

    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.entries.contains_key(uuid)
    }

    pub fn uuids(&self) -> impl Iterator<Item = &Uuid> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &ManifestEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a manifest; any failure is reported as a corrupt manifest
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::corrupt_manifest(e.to_string()))
    }
}

/// One line of the hash index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEntry {
    pub hash: String,
    pub uuid: Uuid,
}

/// Ordered (content-hash, uuid) pairs covering every live entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashIndex {
    entries: Vec<HashEntry>,
}

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hash: impl Into<String>, uuid: Uuid) {
        self.entries.push(HashEntry {
            hash: hash.into(),
            uuid,
        });
    }

    pub fn entries(&self) -> &[HashEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::with_capacity(self.entries.len() * 102);
        for entry in &self.entries {
            out.push_str(&entry.hash);
            out.push(',');
            out.push_str(&entry.uuid.to_string());
            out.push('\n');
        }
        out
    }

    pub fn from_csv(content: &str) -> Result<Self> {
        let mut index = HashIndex::new();
        for (n, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (hash, uuid) = line
                .split_once(',')
                .ok_or_else(|| Error::Other(format!("hash index line {} has no comma", n + 1)))?;
            let uuid = Uuid::parse_str(uuid.trim())
                .map_err(|e| Error::Other(format!("hash index line {}: {}", n + 1, e)))?;
            index.push(hash.trim(), uuid);
        }
        Ok(index)
    }
}
