//! Core synchronization engine
//!
//! The FeedEngine is responsible for:
//! - Fetching the registry via RecordSource
//! - Loading the previous run's entities from FeedStore
//! - Matching, diffing and hashing every entity
//! - Persisting changed documents and the rebuilt indexes
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ RecordSource │─── lines ───┐
//! └──────────────┘             │
//!                              ▼
//!                     ┌──────────────┐        ┌─────────┐
//!                     │  FeedEngine  │◀─ now ─│  Clock  │
//!                     └──────────────┘        └─────────┘
//!                              │
//!         ┌────────────────────┼────────────────────┐
//!         │                    │                    │
//!         ▼                    ▼                    ▼
//! ┌─────────────┐      ┌──────────────┐      ┌─────────────┐
//! │  FeedStore  │      │  FeedStore   │      │   Events    │
//! │ (load prior)│      │  (publish)   │      │  (notify)   │
//! └─────────────┘      └──────────────┘      └─────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Fetch lines, parse, skip malformed ones
//! 2. Group records by identity (fatal on ASN collision)
//! 3. Load prior entities (fatal on corrupt manifest)
//! 4. Resolve and apply each record, reviving retired entities that return
//! 5. Generate manifest and hash index
//! 6. Stage changed documents, then commit them with the indexes
//! 7. Report retired entities

use std::collections::HashSet;

use chrono::Timelike;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{FeedConfig, PublishMode};
use crate::error::{Error, Result};
use crate::sync::{
    AppliedEntity, EntityStore, EntityTemplate, FeedIndex, IdentityResolver, Publisher,
    RecordParser, apply, group_by_identity,
};
use crate::traits::{Clock, FeedStore, RecordSource};

/// Events emitted by the FeedEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Run started
    Started { source: &'static str },

    /// A source line was skipped
    RecordSkipped { line: usize, reason: String },

    /// A new entity was allocated
    EntityCreated { uuid: Uuid, title: String },

    /// A retired entity was listed again under its old uuid
    EntityRevived { uuid: Uuid },

    /// An existing entity's attribute set changed
    EntityUpdated {
        uuid: Uuid,
        added: usize,
        removed: usize,
    },

    /// An existing entity matched its record exactly
    EntityUnchanged { uuid: Uuid },

    /// A previously live entity is absent from this run's input
    EntityRetired { uuid: Uuid },

    /// Run finished and the indexes were committed
    Completed { report: SyncReport },
}

/// Outcome of one synchronization pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub revived: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub retired: usize,
    pub skipped_lines: usize,
    pub documents_written: usize,
    pub hash_entries: usize,
}

impl SyncReport {
    /// Entities in the new manifest
    pub fn live(&self) -> usize {
        self.created + self.revived + self.updated + self.unchanged
    }

    /// Whether the published feed differs from the previous run's
    pub fn has_changes(&self) -> bool {
        self.created + self.revived + self.updated + self.retired > 0
    }
}

/// Core synchronization engine
///
/// One call to [`FeedEngine::run()`] is one batch pass. The engine assumes
/// no other pass is running against the same store.
pub struct FeedEngine {
    /// Fetch collaborator
    source: Box<dyn RecordSource>,

    /// Storage collaborator
    store: Box<dyn FeedStore>,

    /// Time source for changed entities
    clock: Box<dyn Clock>,

    parser: RecordParser,

    /// Metadata stamped on new entities
    template: EntityTemplate,

    publish_mode: PublishMode,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl FeedEngine {
    /// Create a new feed engine
    ///
    /// # Parameters
    ///
    /// - `source`: Record source implementation
    /// - `store`: Feed store implementation
    /// - `clock`: Clock implementation
    /// - `config`: Feed configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields sync events
    pub fn new(
        source: Box<dyn RecordSource>,
        store: Box<dyn FeedStore>,
        clock: Box<dyn Clock>,
        config: FeedConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            source,
            store,
            clock,
            parser: RecordParser::from_config(&config.parser),
            template: EntityTemplate::from_config(&config)?,
            publish_mode: config.publish.mode,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run one synchronization pass
    ///
    /// # Returns
    ///
    /// - `Ok(SyncReport)`: Documents and indexes were written
    /// - `Err(Error)`: Fatal error; the previous manifest and hash index are untouched
    pub async fn run(&self) -> Result<SyncReport> {
        match self.run_internal().await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!("Synchronization aborted: {}", e);
                Err(e)
            }
        }
    }

    async fn run_internal(&self) -> Result<SyncReport> {
        self.emit_event(SyncEvent::Started {
            source: self.source.source_name(),
        });

        let lines = self.source.fetch_lines().await?;
        info!(
            "Fetched {} line(s) from {} source",
            lines.len(),
            self.source.source_name()
        );

        let mut report = SyncReport::default();

        let parsed = self.parser.parse_all(&lines);
        for skipped in &parsed.skipped {
            warn!("Skipping {}", skipped);
            if let Error::MalformedRecord { line, reason } = skipped {
                self.emit_event(SyncEvent::RecordSkipped {
                    line: *line,
                    reason: reason.clone(),
                });
            }
        }
        report.skipped_lines = parsed.skipped.len();

        let records = group_by_identity(parsed.records)?;
        let prior = EntityStore::load(self.store.as_ref()).await?;
        debug!(
            "{} record(s) against {} prior entit(ies)",
            records.len(),
            prior.len()
        );

        // Documents carry whole seconds
        let now = self.clock.now();
        let now = now.with_nanosecond(0).unwrap_or(now);
        let resolver = IdentityResolver::new(&prior, &self.template);
        let applied: Vec<AppliedEntity> = records
            .iter()
            .map(|record| apply(resolver.resolve(record, now), record, now))
            .collect();

        let index = FeedIndex::generate(applied.iter().map(|a| &a.entity))?;
        report.hash_entries = index.hashes.len();

        report.documents_written = Publisher::new(self.store.as_ref(), self.publish_mode)
            .publish(&applied, &index)
            .await?;

        for entry in &applied {
            self.record_outcome(entry, &mut report);
        }

        let live: HashSet<&Uuid> = index.manifest.uuids().collect();
        let mut retired: Vec<&Uuid> = prior.uuids().filter(|u| !live.contains(u)).collect();
        retired.sort();
        for uuid in retired {
            debug!("Entity {} retired", uuid);
            self.emit_event(SyncEvent::EntityRetired { uuid: *uuid });
            report.retired += 1;
        }

        info!(
            "Sync complete: {} created, {} revived, {} updated, {} unchanged, {} retired, {} line(s) skipped, {} document(s) written",
            report.created,
            report.revived,
            report.updated,
            report.unchanged,
            report.retired,
            report.skipped_lines,
            report.documents_written
        );
        self.emit_event(SyncEvent::Completed {
            report: report.clone(),
        });

        Ok(report)
    }

    fn record_outcome(&self, entry: &AppliedEntity, report: &mut SyncReport) {
        let uuid = entry.entity.uuid;
        if entry.is_new {
            debug!("Created entity {} ({})", uuid, entry.entity.title);
            report.created += 1;
            self.emit_event(SyncEvent::EntityCreated {
                uuid,
                title: entry.entity.title.clone(),
            });
        } else if entry.revived {
            debug!("Revived entity {} ({})", uuid, entry.entity.title);
            report.revived += 1;
            self.emit_event(SyncEvent::EntityRevived { uuid });
        } else if entry.changed {
            debug!(
                "Updated entity {}: +{} -{}",
                uuid,
                entry.added.len(),
                entry.removed.len()
            );
            report.updated += 1;
            self.emit_event(SyncEvent::EntityUpdated {
                uuid,
                added: entry.added.len(),
                removed: entry.removed.len(),
            });
        } else {
            report.unchanged += 1;
            self.emit_event(SyncEvent::EntityUnchanged { uuid });
        }
    }

    /// Emit a sync event
    fn emit_event(&self, event: SyncEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    "Event channel full, dropping event. Consider increasing event_channel_capacity."
                );
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
