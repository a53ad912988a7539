//! Publisher
//!
//! Decides which entity documents must be written, stages them, and then
//! commits documents and both index files together.

use tracing::{debug, error, warn};

use super::diff::AppliedEntity;
use super::index::FeedIndex;
use crate::config::PublishMode;
use crate::error::{Error, Result};
use crate::traits::FeedStore;

/// Writes one run's output through a [`FeedStore`]
pub struct Publisher<'a> {
    store: &'a dyn FeedStore,
    mode: PublishMode,
}

impl<'a> Publisher<'a> {
    pub fn new(store: &'a dyn FeedStore, mode: PublishMode) -> Self {
        Self { store, mode }
    }

    /// Whether `applied` needs its document (re)written under this mode
    pub fn needs_write(&self, applied: &AppliedEntity) -> bool {
        match self.mode {
            PublishMode::Incremental => applied.changed,
            PublishMode::Full => true,
        }
    }

    /// Stage documents, then commit them with the indexes
    ///
    /// Nothing is published unless every document was staged. On any
    /// failure the staged documents are discarded. Retired documents are
    /// never deleted.
    ///
    /// # Returns
    ///
    /// The number of entity documents written.
    pub async fn publish(&self, applied: &[AppliedEntity], index: &FeedIndex) -> Result<usize> {
        match self.stage_and_commit(applied, index).await {
            Ok(written) => Ok(written),
            Err(e) => {
                if let Err(discard) = self.store.discard_staged().await {
                    warn!("Failed to discard staged documents: {}", discard);
                }
                Err(e)
            }
        }
    }

    async fn stage_and_commit(&self, applied: &[AppliedEntity], index: &FeedIndex) -> Result<usize> {
        let mut written = 0;
        for entry in applied.iter().filter(|a| self.needs_write(a)) {
            self.store
                .stage_entity(&entry.entity)
                .await
                .map_err(|e| {
                    error!("Failed to stage entity {}: {}", entry.entity.uuid, e);
                    persistence(e)
                })?;
            debug!("Staged entity {}", entry.entity.uuid);
            written += 1;
        }

        self.store
            .commit(&index.manifest, &index.hashes)
            .await
            .map_err(|e| {
                error!("Failed to commit documents and indexes: {}", e);
                persistence(e)
            })?;

        Ok(written)
    }
}

fn persistence(err: Error) -> Error {
    match err {
        Error::Persistence(_) => err,
        other => Error::persistence(other.to_string()),
    }
}
