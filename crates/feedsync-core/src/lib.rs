// # feedsync-core
//
// Core library for the incremental threat-intelligence feed generator.
//
// ## Architecture Overview
//
// This library turns a delimited ASN registry into a feed of stable
// entities whose identity and timestamps survive across runs:
// - **RecordSource**: Trait for fetching the raw registry lines
// - **FeedStore**: Trait for loading the previous run and persisting output
// - **Clock**: Trait for the timestamp stamped on changed entities
// - **FeedEngine**: Core engine that orchestrates parse → match → diff → publish
// - **CollaboratorRegistry**: Plugin-based registry for sources and stores
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from I/O implementations
// 2. **Stable Identity**: An organisation keeps its uuid for as long as it is listed
// 3. **Plugin-Based**: Sources and stores are registered dynamically
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: Re-running on identical input yields identical output

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod registry;
pub mod source;
pub mod storage;
pub mod sync;
pub mod traits;

// Re-export core types for convenience
pub use config::{FeedConfig, OrganisationConfig, PublishMode, SourceConfig, StoreConfig};
pub use engine::{FeedEngine, SyncEvent, SyncReport};
pub use error::{Error, Result};
pub use model::{Entity, IdentityKey, SourceRecord};
pub use registry::CollaboratorRegistry;
pub use source::{FileRecordSource, StaticRecordSource};
pub use storage::{FileFeedStore, MemoryFeedStore};
pub use traits::{Clock, FeedStore, FixedClock, RecordSource, SystemClock};
