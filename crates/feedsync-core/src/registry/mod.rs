//! Plugin-based collaborator registry
//!
//! The registry allows record sources and feed stores to be registered
//! by type name at runtime, avoiding hardcoded if-else chains in the
//! binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use feedsync_core::registry::CollaboratorRegistry;
//!
//! let registry = CollaboratorRegistry::with_builtins();
//!
//! // In feedsync-source-http
//! feedsync_source_http::register(&registry);
//!
//! let source = registry.create_source(&config.source)?;
//! let store = registry.create_store(&config.store).await?;
//! ```

use crate::config::{SourceConfig, StoreConfig};
use crate::error::{Error, Result};
use crate::source::FileRecordSourceFactory;
use crate::storage::{FileFeedStoreFactory, MemoryFeedStoreFactory};
use crate::traits::{FeedStore, FeedStoreFactory, RecordSource, RecordSourceFactory};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry of record source and feed store factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct CollaboratorRegistry {
    /// Registered record source factories
    sources: RwLock<HashMap<String, Box<dyn RecordSourceFactory>>>,

    /// Registered feed store factories
    stores: RwLock<HashMap<String, Arc<dyn FeedStoreFactory>>>,
}

impl CollaboratorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the collaborators this crate ships
    ///
    /// - sources: `file`
    /// - stores: `file`, `memory`
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_source("file", Box::new(FileRecordSourceFactory));
        registry.register_store("file", Box::new(FileFeedStoreFactory));
        registry.register_store("memory", Box::new(MemoryFeedStoreFactory));
        registry
    }

    /// Register a record source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Source type name (e.g., "file", "http")
    /// - `factory`: Factory object for creating source instances
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn RecordSourceFactory>) {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.insert(name.into(), factory);
    }

    /// Register a feed store factory
    ///
    /// # Parameters
    ///
    /// - `name`: Store type name (e.g., "file", "memory")
    /// - `factory`: Factory object for creating store instances
    pub fn register_store(&self, name: impl Into<String>, factory: Box<dyn FeedStoreFactory>) {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        stores.insert(name.into(), Arc::from(factory));
    }

    /// Create a record source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn RecordSource>)`: Created source instance
    /// - `Err(Error)`: If the source type is not registered or creation fails
    pub fn create_source(&self, config: &SourceConfig) -> Result<Box<dyn RecordSource>> {
        let source_type = config.type_name();
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);

        let factory = sources
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown source type: {}", source_type)))?;

        factory.create(config)
    }

    /// Create a feed store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn FeedStore>)`: Created store instance
    /// - `Err(Error)`: If the store type is not registered or creation fails
    pub async fn create_store(&self, config: &StoreConfig) -> Result<Box<dyn FeedStore>> {
        let store_type = config.type_name();

        let factory = {
            let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
            stores
                .get(store_type)
                .ok_or_else(|| Error::config(format!("Unknown store type: {}", store_type)))?
                .clone()
        };

        // Lock released before awaiting the factory
        factory.create(config).await
    }

    /// List all registered source types
    pub fn list_sources(&self) -> Vec<String> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = sources.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all registered store types
    pub fn list_stores(&self) -> Vec<String> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = stores.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.contains_key(name)
    }

    /// Check if a store type is registered
    pub fn has_store(&self, name: &str) -> bool {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.contains_key(name)
    }
}
