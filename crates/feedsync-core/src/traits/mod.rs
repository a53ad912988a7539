//! Collaborator traits for the feed synchronization engine
//!
//! The engine owns the synchronization logic; everything that touches the
//! outside world sits behind one of these interfaces.
//!
//! - [`RecordSource`]: Hands the engine the raw registry lines
//! - [`FeedStore`]: Loads prior published state and persists the new one
//! - [`Clock`]: Supplies the run time used for changed entities

pub mod clock;
pub mod feed_store;
pub mod record_source;

pub use clock::{Clock, FixedClock, SystemClock};
pub use feed_store::{FeedStore, FeedStoreFactory};
pub use record_source::{RecordSource, RecordSourceFactory};
