// # Feed Store Implementations
//
// This module provides implementations of the FeedStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::{FileFeedStore, FileFeedStoreFactory};
pub use memory::{MemoryFeedStore, MemoryFeedStoreFactory};
