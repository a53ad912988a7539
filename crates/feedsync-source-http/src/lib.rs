// # HTTP Record Source
//
// This crate provides an HTTP-based record source for the feedsync engine.
//
// ## Purpose
//
// Registries are usually published as a plain delimited text file on a
// public mirror. This source downloads that file in one request per run
// and hands its lines to the engine unchanged.
//
// ## Architecture
//
// One GET per `fetch_lines()` call. No caching, no polling: the engine is
// a batch job and every run wants the current file.

use feedsync_core::CollaboratorRegistry;
use feedsync_core::config::SourceConfig;
use feedsync_core::source::decode_lines;
use feedsync_core::traits::{RecordSource, RecordSourceFactory};
use feedsync_core::{Error, Result};

use std::time::Duration;

/// HTTP-based record source
pub struct HttpRecordSource {
    /// URL of the registry file
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpRecordSource {
    /// Create a new HTTP record source
    ///
    /// # Parameters
    ///
    /// - `url`: URL of the delimited registry file
    /// - `timeout`: Request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch_lines(&self) -> Result<Vec<String>> {
        tracing::debug!("Fetching registry from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::http(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::source(format!(
                "Registry download from {} returned HTTP {}",
                self.url, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::http(format!("Failed to read response body: {}", e)))?;

        let lines = decode_lines(&body, &self.url);
        tracing::info!("Downloaded {} line(s) from {}", lines.len(), self.url);
        Ok(lines)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Factory for creating HTTP record sources
pub struct HttpRecordSourceFactory;

impl RecordSourceFactory for HttpRecordSourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn RecordSource>> {
        match config {
            SourceConfig::Http { url, timeout_secs } => Ok(Box::new(HttpRecordSource::new(
                url.clone(),
                Duration::from_secs(*timeout_secs),
            )?)),
            _ => Err(Error::config("Invalid config for HTTP record source")),
        }
    }
}

/// Register the HTTP record source with a registry
pub fn register(registry: &CollaboratorRegistry) {
    registry.register_source("http", Box::new(HttpRecordSourceFactory));
}
