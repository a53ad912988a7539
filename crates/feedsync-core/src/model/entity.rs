// # Entity Model
//
// An entity is the publishable unit of the feed: one organization's ASN
// declaration plus the CIDR blocks registered to it.
//
// ## Document Format
//
// ```json
// {
//   "Event": {
//     "uuid": "5d1f6c3e-...",
//     "info": "Example Networks 00.000.000/0001-00",
//     "date": "2026-10-19",
//     "timestamp": 1792368000,
//     "published": false,
//     "analysis": 0,
//     "threat_level_id": 1,
//     "Tag": [],
//     "Orgc": { "name": "...", "uuid": "..." },
//     "Source": { "org": "Example Networks", "registrant_id": "00.000.000/0001-00" },
//     "Attribute": [
//       { "uuid": "...", "type": "AS", "category": "Network activity", "value": "64500", ... },
//       { "uuid": "...", "type": "ip-dst", "category": "Network activity", "value": "192.0.2.0/24", ... }
//     ]
//   }
// }
// ```
//
// Attributes are always emitted in canonical order (ASN first, then CIDR
// blocks sorted by value) so that an unchanged entity serializes to the
// same bytes on every run.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::Result;

/// MISP category used for every attribute this feed emits
pub const NETWORK_ACTIVITY: &str = "Network activity";

/// Lowercase hex SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Autonomous system number declaration
    #[serde(rename = "AS")]
    Asn,
    /// Address block declaration
    #[serde(rename = "ip-dst")]
    Cidr,
}

impl AttributeKind {
    /// Wire name of the attribute type
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeKind::Asn => "AS",
            AttributeKind::Cidr => "ip-dst",
        }
    }

    fn default_to_ids(&self) -> bool {
        matches!(self, AttributeKind::Cidr)
    }
}

/// A single typed value attached to an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Assigned when the attribute is first added, kept while it survives
    pub uuid: Uuid,
    #[serde(rename = "type")]
    pub kind: AttributeKind,
    pub category: String,
    pub value: String,
    pub to_ids: bool,
    /// When the attribute was added
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

impl Attribute {
    /// Create a fresh attribute with a new uuid
    pub fn new(kind: AttributeKind, value: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            kind,
            category: NETWORK_ACTIVITY.to_string(),
            value: value.into(),
            to_ids: kind.default_to_ids(),
            timestamp,
        }
    }

    /// ASN declaration
    pub fn asn(value: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(AttributeKind::Asn, value, timestamp)
    }

    /// CIDR block declaration
    pub fn cidr(value: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(AttributeKind::Cidr, value, timestamp)
    }

    /// Type and value equality, ignoring uuid and timestamp
    pub fn same_value(&self, other: &Attribute) -> bool {
        self.kind == other.kind && self.value == other.value
    }

    /// Hash of the attribute value, as listed in the hash index
    pub fn value_hash(&self) -> String {
        sha256_hex(self.value.as_bytes())
    }
}

/// The attributes of one entity
///
/// Holds at most one ASN attribute and a deduplicated set of CIDR
/// attributes keyed by value. Iteration order is canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Attribute>", into = "Vec<Attribute>")]
pub struct AttributeSet {
    asn: Option<Attribute>,
    cidrs: BTreeMap<String, Attribute>,
}

impl AttributeSet {
    /// Create an empty attribute set
    pub fn new() -> Self {
        Self::default()
    }

    /// The ASN attribute, if set
    pub fn asn(&self) -> Option<&Attribute> {
        self.asn.as_ref()
    }

    /// The ASN value, if set
    pub fn asn_value(&self) -> Option<&str> {
        self.asn.as_ref().map(|a| a.value.as_str())
    }

    /// CIDR attributes sorted by value
    pub fn cidrs(&self) -> impl Iterator<Item = &Attribute> {
        self.cidrs.values()
    }

    /// CIDR values sorted lexicographically
    pub fn cidr_values(&self) -> impl Iterator<Item = &str> {
        self.cidrs.keys().map(String::as_str)
    }

    pub fn contains_cidr(&self, value: &str) -> bool {
        self.cidrs.contains_key(value)
    }

    pub fn len(&self) -> usize {
        self.cidrs.len() + usize::from(self.asn.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.asn.is_none() && self.cidrs.is_empty()
    }

    /// All attributes in canonical order (ASN first, then CIDRs by value)
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.asn.iter().chain(self.cidrs.values())
    }

    /// Set the ASN attribute, returning the one it replaced
    pub fn set_asn(&mut self, attribute: Attribute) -> Option<Attribute> {
        debug_assert_eq!(attribute.kind, AttributeKind::Asn);
        self.asn.replace(attribute)
    }

    /// Insert a CIDR attribute; returns `false` if the value was already present
    pub fn insert_cidr(&mut self, attribute: Attribute) -> bool {
        debug_assert_eq!(attribute.kind, AttributeKind::Cidr);
        if self.cidrs.contains_key(&attribute.value) {
            return false;
        }
        self.cidrs.insert(attribute.value.clone(), attribute);
        true
    }

    /// Remove a CIDR attribute by value
    pub fn remove_cidr(&mut self, value: &str) -> Option<Attribute> {
        self.cidrs.remove(value)
    }
}

impl TryFrom<Vec<Attribute>> for AttributeSet {
    type Error = String;

    fn try_from(attributes: Vec<Attribute>) -> std::result::Result<Self, Self::Error> {
        let mut set = AttributeSet::new();
        for attribute in attributes {
            match attribute.kind {
                AttributeKind::Asn => {
                    if let Some(existing) = set.set_asn(attribute) {
                        return Err(format!(
                            "entity declares more than one ASN (found {} twice or more)",
                            existing.value
                        ));
                    }
                }
                AttributeKind::Cidr => {
                    let value = attribute.value.clone();
                    if !set.insert_cidr(attribute) {
                        return Err(format!("duplicate CIDR attribute {}", value));
                    }
                }
            }
        }
        Ok(set)
    }
}

impl From<AttributeSet> for Vec<Attribute> {
    fn from(set: AttributeSet) -> Self {
        set.asn.into_iter().chain(set.cidrs.into_values()).collect()
    }
}

/// Publishing organization stamped on every entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organisation {
    pub name: String,
    pub uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// Fixed severity/analysis metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// 0 = initial, 1 = ongoing, 2 = completed
    pub analysis: u8,
    /// 1 = high, 2 = medium, 3 = low, 4 = undefined
    pub threat_level_id: u8,
    #[serde(rename = "Tag", default)]
    pub tags: Vec<Tag>,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            analysis: 0,
            threat_level_id: 1,
            tags: Vec::new(),
        }
    }
}

/// Stable source fields an entity's identity is derived from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceIdentity {
    pub org: String,
    pub registrant_id: String,
}

impl SourceIdentity {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(&self.org, &self.registrant_id)
    }
}

/// Deterministic identity of an entity across runs
///
/// Derived from organization name and registrant id. The ASN is not part
/// of the key: an ASN reassignment under the same organization updates
/// the existing entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentityKey {
    org: String,
    registrant_id: String,
}

impl IdentityKey {
    pub fn new(org: &str, registrant_id: &str) -> Self {
        Self {
            org: org.trim().to_string(),
            registrant_id: registrant_id.trim().to_string(),
        }
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn registrant_id(&self) -> &str {
        &self.registrant_id
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.org, self.registrant_id)
    }
}

/// One published feed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Assigned once at creation, never changed
    pub uuid: Uuid,
    #[serde(rename = "info")]
    pub title: String,
    /// Creation date
    pub date: NaiveDate,
    /// Last time the attribute set changed
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub published: bool,
    #[serde(flatten)]
    pub classification: Classification,
    #[serde(rename = "Orgc")]
    pub orgc: Organisation,
    #[serde(rename = "Source")]
    pub source: SourceIdentity,
    #[serde(rename = "Attribute")]
    pub attributes: AttributeSet,
}

#[derive(Serialize, Deserialize)]
struct EntityDocument<T> {
    #[serde(rename = "Event")]
    event: T,
}

impl Entity {
    /// Human-readable label for an organization
    pub fn title_for(org: &str, registrant_id: &str) -> String {
        format!("{} {}", org, registrant_id)
    }

    /// Identity recomputed from the stable source fields
    pub fn identity_key(&self) -> IdentityKey {
        self.source.identity_key()
    }

    /// Serialize as a pretty-printed feed document
    pub fn to_document(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&EntityDocument { event: self })?)
    }

    /// Parse a feed document
    pub fn from_document(content: &str) -> Result<Self> {
        let document: EntityDocument<Entity> = serde_json::from_str(content)?;
        Ok(document.event)
    }

    /// Compact serialization the content hash is computed over
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&EntityDocument { event: self })?)
    }

    /// SHA-256 over the canonical serialization
    pub fn content_hash(&self) -> Result<String> {
        Ok(sha256_hex(&self.canonical_bytes()?))
    }
}
