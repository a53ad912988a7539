//! Error types for the feed synchronization system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for feed synchronization operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the feed synchronization system
#[derive(Error, Debug)]
pub enum Error {
    /// A source line could not be turned into a record (non-fatal, line is skipped)
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord {
        /// 1-based line number in the fetched input
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// The prior manifest exists but cannot be parsed (fatal)
    #[error("Corrupt manifest: {0}")]
    CorruptManifest(String),

    /// Two records of the same run resolve to one identity with different ASNs (fatal)
    #[error(
        "Identity collision for '{org}' ({registrant_id}): ASN {first_asn} conflicts with ASN {second_asn}"
    )]
    IdentityCollision {
        /// Organization name of the colliding identity
        org: String,
        /// Registrant id of the colliding identity
        registrant_id: String,
        /// ASN seen first in this run
        first_asn: String,
        /// Conflicting ASN seen later in this run
        second_asn: String,
    },

    /// The storage collaborator failed to persist a document or index
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Prior state is inconsistent (missing or unreadable entity documents)
    #[error("Entity store error: {0}")]
    EntityStore(String),

    /// Record source (fetch collaborator) errors
    #[error("Record source error: {0}")]
    Source(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from the HTTP record source)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a malformed record error
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    /// Create a corrupt manifest error
    pub fn corrupt_manifest(msg: impl Into<String>) -> Self {
        Self::CorruptManifest(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create an entity store error
    pub fn entity_store(msg: impl Into<String>) -> Self {
        Self::EntityStore(msg.into())
    }

    /// Create a record source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
