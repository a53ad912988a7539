//! Value types shared by the synchronization pipeline
//!
//! - [`SourceRecord`]: one parsed line of the ownership registry
//! - [`Entity`]: one published feed document
//! - [`Manifest`] / [`HashIndex`]: the two index files rebuilt every run

pub mod entity;
pub mod index;
pub mod record;

pub use entity::{
    Attribute, AttributeKind, AttributeSet, Classification, Entity, IdentityKey, Organisation,
    SourceIdentity, Tag,
};
pub use index::{HashEntry, HashIndex, Manifest, ManifestEntry};
pub use record::SourceRecord;
