//! Synchronization pipeline
//!
//! One run flows through these stages in order:
//!
//! ```text
//! lines ─▶ RecordParser ─▶ group_by_identity ─▶ IdentityResolver ─▶ apply()
//!                                  ▲                                   │
//!                      EntityStore (prior run)                         ▼
//!                                              Publisher ◀─ FeedIndex::generate()
//! ```
//!
//! Every stage except [`EntityStore::load`] and [`Publisher::publish`] is
//! pure and works on value types.

pub mod diff;
pub mod entity_store;
pub mod index;
pub mod parser;
pub mod publisher;
pub mod resolver;

pub use diff::{AppliedEntity, apply};
pub use entity_store::EntityStore;
pub use index::{EntityDigest, FeedIndex};
pub use parser::{ParsedLines, ParsedRecord, RecordParser};
pub use publisher::Publisher;
pub use resolver::{EntityTemplate, IdentityResolver, Resolved, group_by_identity};
