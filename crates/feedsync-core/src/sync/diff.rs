//! Diff & update engine
//!
//! [`apply`] is the heart of a synchronization run. It takes a resolved
//! entity and the record it was matched with and produces the entity's new
//! attribute set, the minimal list of additions and removals that got it
//! there, and whether the entity changed.
//!
//! ## Rules
//!
//! - Target attributes are the record's ASN plus its distinct CIDR blocks.
//! - CIDR blocks are compared as a set; reordering is not a change.
//! - CIDR attributes missing from the record are removed.
//! - The ASN attribute is never dropped. When the record carries a
//!   different ASN it is replaced, which counts as one removal and one
//!   addition.
//! - Surviving attributes keep their uuid and timestamp.
//! - The entity timestamp advances only when something was added or
//!   removed, or the entity is new or revived.

use chrono::{DateTime, Utc};

use super::resolver::Resolved;
use crate::model::{Attribute, Entity, SourceRecord};

/// Result of applying a record to an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEntity {
    pub entity: Entity,
    pub is_new: bool,
    pub revived: bool,
    pub changed: bool,
    pub added: Vec<Attribute>,
    pub removed: Vec<Attribute>,
}

/// Bring `resolved.entity` in line with `record`
///
/// Pure: no I/O, and `now` is the only source of time.
pub fn apply(resolved: Resolved, record: &SourceRecord, now: DateTime<Utc>) -> AppliedEntity {
    let Resolved {
        mut entity,
        is_new,
        revived,
    } = resolved;
    let mut added = Vec::new();
    let mut removed = Vec::new();

    let target_cidrs = record.distinct_cidrs();

    let stale: Vec<String> = entity
        .attributes
        .cidr_values()
        .filter(|value| !target_cidrs.contains(value))
        .map(str::to_string)
        .collect();
    for value in stale {
        if let Some(attribute) = entity.attributes.remove_cidr(&value) {
            removed.push(attribute);
        }
    }

    if entity.attributes.asn_value() != Some(record.asn.as_str()) {
        let attribute = Attribute::asn(record.asn.as_str(), now);
        added.push(attribute.clone());
        if let Some(previous) = entity.attributes.set_asn(attribute) {
            removed.push(previous);
        }
    }

    for value in target_cidrs {
        if !entity.attributes.contains_cidr(value) {
            let attribute = Attribute::cidr(value, now);
            added.push(attribute.clone());
            entity.attributes.insert_cidr(attribute);
        }
    }

    let changed = is_new || revived || !added.is_empty() || !removed.is_empty();
    if changed {
        entity.timestamp = now;
    }

    AppliedEntity {
        entity,
        is_new,
        revived,
        changed,
        added,
        removed,
    }
}
