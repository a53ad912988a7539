// # Record Source Trait
//
// Defines the interface of the fetch collaborator.
//
// ## Purpose
//
// A record source pulls the ownership registry from wherever it is
// published and hands the engine its raw text lines. Transport concerns
// (timeouts, retries, TLS) live entirely in the implementation.
//
// ## Implementations
//
// - File-based: `FileRecordSource` (this crate)
// - In-memory: `StaticRecordSource` (this crate)
// - HTTP(S): `feedsync-source-http` crate

use async_trait::async_trait;

use crate::config::SourceConfig;
use crate::error::Result;

/// Trait for fetch collaborators
///
/// # Trust Level: Untrusted Input
///
/// Lines returned here are raw and may be malformed. Validation is the
/// parser's job, not the source's.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the full registry as text lines
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<String>)`: Every line of the published file, in order
    /// - `Err(Error)`: The registry could not be fetched; the run aborts
    async fn fetch_lines(&self) -> Result<Vec<String>>;

    /// Short name for logs (e.g. "file", "http")
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing record sources from configuration
pub trait RecordSourceFactory: Send + Sync {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn RecordSource>>;
}
