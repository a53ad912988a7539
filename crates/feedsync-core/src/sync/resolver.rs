//! Identity resolver
//!
//! Pairs each source record with the entity it updates. A retired entity
//! whose identity returns is revived under its old uuid; a new entity is
//! only allocated when the identity has never been published.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::entity_store::EntityStore;
use super::parser::ParsedRecord;
use crate::config::FeedConfig;
use crate::error::{Error, Result};
use crate::model::{
    AttributeSet, Classification, Entity, IdentityKey, Organisation, SourceIdentity, SourceRecord,
};

/// Metadata stamped on entities at creation
///
/// Existing entities keep the metadata they were created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTemplate {
    pub organisation: Organisation,
    pub classification: Classification,
    pub published: bool,
}

impl EntityTemplate {
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        Ok(Self {
            organisation: config.organisation.to_organisation()?,
            classification: config.classification.to_classification(),
            published: config.classification.published,
        })
    }

    /// A new, attribute-less entity for `record`
    pub fn instantiate(&self, record: &SourceRecord, now: DateTime<Utc>) -> Entity {
        let key = record.identity_key();
        Entity {
            uuid: Uuid::new_v4(),
            title: Entity::title_for(key.org(), key.registrant_id()),
            date: now.date_naive(),
            timestamp: now,
            published: self.published,
            classification: self.classification.clone(),
            orgc: self.organisation.clone(),
            source: SourceIdentity {
                org: key.org().to_string(),
                registrant_id: key.registrant_id().to_string(),
            },
            attributes: AttributeSet::new(),
        }
    }
}

/// An entity ready to be diffed against its record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub entity: Entity,
    /// Allocated in this run; always counts as changed
    pub is_new: bool,
    /// Retired before this run and listed again; always counts as changed
    pub revived: bool,
}

/// Maps records to prior entities by identity key
#[derive(Debug, Clone, Copy)]
pub struct IdentityResolver<'a> {
    store: &'a EntityStore,
    template: &'a EntityTemplate,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(store: &'a EntityStore, template: &'a EntityTemplate) -> Self {
        Self { store, template }
    }

    /// Resolve a record to its existing entity or a freshly allocated one
    ///
    /// An existing entity, live or retired, always comes back with its
    /// stored uuid; a new uuid is only minted on a miss in both.
    pub fn resolve(&self, record: &SourceRecord, now: DateTime<Utc>) -> Resolved {
        let key = record.identity_key();
        if let Some(existing) = self.store.get(&key) {
            return Resolved {
                entity: existing.clone(),
                is_new: false,
                revived: false,
            };
        }
        if let Some(retired) = self.store.get_retained(&key) {
            debug!("Reviving retired entity {} for {}", retired.uuid, key);
            return Resolved {
                entity: retired.clone(),
                is_new: false,
                revived: true,
            };
        }
        Resolved {
            entity: self.template.instantiate(record, now),
            is_new: true,
            revived: false,
        }
    }
}

/// Collapse records that share an identity key
///
/// Records with the same key and ASN are merged (CIDR union, first-seen
/// order kept). The same key with a different ASN cannot be resolved
/// safely and fails the run with `IdentityCollision`.
pub fn group_by_identity(records: Vec<ParsedRecord>) -> Result<Vec<SourceRecord>> {
    let mut slots: HashMap<IdentityKey, usize> = HashMap::with_capacity(records.len());
    let mut grouped: Vec<SourceRecord> = Vec::with_capacity(records.len());

    for ParsedRecord { line, record } in records {
        match slots.entry(record.identity_key()) {
            Entry::Vacant(slot) => {
                slot.insert(grouped.len());
                grouped.push(record);
            }
            Entry::Occupied(slot) => {
                let first = &mut grouped[*slot.get()];
                if first.asn != record.asn {
                    return Err(Error::IdentityCollision {
                        org: slot.key().org().to_string(),
                        registrant_id: slot.key().registrant_id().to_string(),
                        first_asn: first.asn.clone(),
                        second_asn: record.asn,
                    });
                }
                warn!(
                    "Line {}: duplicate record for {}, merging address blocks",
                    line,
                    slot.key()
                );
                first.cidrs.extend(record.cidrs);
            }
        }
    }

    Ok(grouped)
}
