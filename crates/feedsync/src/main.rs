// # feedsync - feed synchronization runner
//
// The feedsync binary is a thin integration layer. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering record sources and feed stores
// 4. Running exactly one synchronization pass
//
// All parsing, matching, diffing and publishing lives in feedsync-core.
//
// ## Configuration
//
// ### Source
// - `FEEDSYNC_SOURCE_TYPE`: Type of record source (http, file). Default: http
// - `FEEDSYNC_SOURCE_URL`: Registry URL (for http)
// - `FEEDSYNC_SOURCE_PATH`: Registry path (for file)
// - `FEEDSYNC_HTTP_TIMEOUT_SECS`: Download timeout in seconds. Default: 60
// - `FEEDSYNC_DELIMITER`: Field separator. Default: `|`
//
// ### Output
// - `FEEDSYNC_OUTPUT_DIR`: Feed directory (documents, manifest.json, hashes.csv)
// - `FEEDSYNC_PUBLISH_MODE`: incremental or full. Default: incremental
//
// ### Entity metadata (applied to new entities only)
// - `FEEDSYNC_ORG_NAME`: Publishing organization name
// - `FEEDSYNC_ORG_UUID`: Publishing organization uuid
// - `FEEDSYNC_THREAT_LEVEL`: 1-4. Default: 1
// - `FEEDSYNC_ANALYSIS`: 0-2. Default: 0
// - `FEEDSYNC_PUBLISHED`: true or false. Default: false
// - `FEEDSYNC_TAGS`: Comma-separated tag names
//
// ### Logging
// - `FEEDSYNC_LOG_LEVEL`: trace, debug, info, warn, error. Default: info
//
// ## Example
//
// ```bash
// export FEEDSYNC_SOURCE_URL=https://registry.example.net/asn-blocks.txt
// export FEEDSYNC_OUTPUT_DIR=/var/lib/feedsync/feed
// export FEEDSYNC_ORG_NAME=CERT.example
// export FEEDSYNC_ORG_UUID=5f6e2d5c-9a3b-4c1e-8f7a-2b4d6c8e0a1f
//
// feedsync
// ```

use anyhow::{Context, Result};
use feedsync_core::config::{
    ClassificationConfig, FeedConfig, OrganisationConfig, ParserConfig, PublishConfig,
    PublishMode, SourceConfig, StoreConfig,
};
use feedsync_core::{CollaboratorRegistry, FeedEngine, SyncEvent, SystemClock};
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Pass completed, feed written
/// - 1: Configuration or startup error
/// - 2: Fatal error during the pass; previous indexes left intact
#[derive(Debug, Clone, Copy)]
enum FeedsyncExitCode {
    Success = 0,
    ConfigError = 1,
    RunFailure = 2,
}

impl From<FeedsyncExitCode> for ExitCode {
    fn from(code: FeedsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    source_type: String,
    source_url: Option<String>,
    source_path: Option<String>,
    http_timeout_secs: u64,
    delimiter: char,
    output_dir: Option<String>,
    publish_mode: PublishMode,
    org_name: String,
    org_uuid: String,
    threat_level_id: u8,
    analysis: u8,
    published: bool,
    tags: Vec<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            source_type: non_empty("FEEDSYNC_SOURCE_TYPE").unwrap_or_else(|| "http".to_string()),
            source_url: non_empty("FEEDSYNC_SOURCE_URL"),
            source_path: non_empty("FEEDSYNC_SOURCE_PATH"),
            http_timeout_secs: parse_or(&non_empty, "FEEDSYNC_HTTP_TIMEOUT_SECS", 60)?,
            delimiter: match lookup("FEEDSYNC_DELIMITER").filter(|v| !v.is_empty()) {
                Some(value) => single_char(&value)?,
                None => '|',
            },
            output_dir: non_empty("FEEDSYNC_OUTPUT_DIR"),
            publish_mode: match non_empty("FEEDSYNC_PUBLISH_MODE").as_deref() {
                None | Some("incremental") => PublishMode::Incremental,
                Some("full") => PublishMode::Full,
                Some(other) => anyhow::bail!(
                    "FEEDSYNC_PUBLISH_MODE '{}' is not valid. Valid modes: incremental, full",
                    other
                ),
            },
            org_name: non_empty("FEEDSYNC_ORG_NAME")
                .context("FEEDSYNC_ORG_NAME is required")?,
            org_uuid: non_empty("FEEDSYNC_ORG_UUID")
                .context("FEEDSYNC_ORG_UUID is required")?,
            threat_level_id: parse_or(&non_empty, "FEEDSYNC_THREAT_LEVEL", 1)?,
            analysis: parse_or(&non_empty, "FEEDSYNC_ANALYSIS", 0)?,
            published: parse_or(&non_empty, "FEEDSYNC_PUBLISHED", false)?,
            tags: non_empty("FEEDSYNC_TAGS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            log_level: non_empty("FEEDSYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration and build the engine configuration
    fn to_feed_config(&self) -> Result<FeedConfig> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "FEEDSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        let source = match self.source_type.as_str() {
            "http" => SourceConfig::Http {
                url: self
                    .source_url
                    .clone()
                    .context("FEEDSYNC_SOURCE_URL is required when FEEDSYNC_SOURCE_TYPE=http")?,
                timeout_secs: self.http_timeout_secs,
            },
            "file" => SourceConfig::File {
                path: self
                    .source_path
                    .clone()
                    .context("FEEDSYNC_SOURCE_PATH is required when FEEDSYNC_SOURCE_TYPE=file")?,
            },
            other => anyhow::bail!(
                "FEEDSYNC_SOURCE_TYPE '{}' is not supported. Supported types: http, file",
                other
            ),
        };

        let store = StoreConfig::File {
            dir: self
                .output_dir
                .clone()
                .context("FEEDSYNC_OUTPUT_DIR is required")?,
        };

        let mut config = FeedConfig::new(
            source,
            store,
            OrganisationConfig::new(&self.org_name, &self.org_uuid),
        );
        config.classification = ClassificationConfig {
            analysis: self.analysis,
            threat_level_id: self.threat_level_id,
            published: self.published,
            tags: self.tags.clone(),
        };
        config.parser = ParserConfig {
            delimiter: self.delimiter,
        };
        config.publish = PublishConfig {
            mode: self.publish_mode,
        };

        config.validate()?;
        Ok(config)
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} '{}' is not valid: {}", key, value, e)),
        None => Ok(default),
    }
}

fn single_char(value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => anyhow::bail!(
            "FEEDSYNC_DELIMITER must be a single character. Got: '{}'",
            value
        ),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return FeedsyncExitCode::ConfigError.into();
        }
    };

    let feed_config = match config.to_feed_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return FeedsyncExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FeedsyncExitCode::ConfigError.into();
    }

    info!(
        "Starting feedsync (source={}, store={})",
        feed_config.source.type_name(),
        feed_config.store.type_name()
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FeedsyncExitCode::RunFailure.into();
        }
    };

    rt.block_on(async {
        match run_once(feed_config).await {
            Ok(()) => FeedsyncExitCode::Success,
            Err(e) => {
                error!("Run failed: {:#}", e);
                FeedsyncExitCode::RunFailure
            }
        }
    })
    .into()
}

/// Run one synchronization pass
async fn run_once(config: FeedConfig) -> Result<()> {
    let registry = CollaboratorRegistry::with_builtins();

    #[cfg(feature = "http")]
    {
        feedsync_source_http::register(&registry);
    }

    let source = registry.create_source(&config.source)?;
    let store = registry.create_store(&config.store).await?;

    let (engine, mut events) = FeedEngine::new(source, store, Box::new(SystemClock), config)?;

    let listener = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SyncEvent::EntityRetired { uuid } => {
                    info!("Entity {} no longer listed; document kept", uuid);
                }
                SyncEvent::EntityRevived { uuid } => {
                    info!("Entity {} listed again; uuid reused", uuid);
                }
                _ => {}
            }
        }
    });

    let result = engine.run().await;
    // Closes the event channel
    drop(engine);
    if let Err(e) = listener.await {
        warn!("Event listener failed: {}", e);
    }
    let report = result?;

    if report.has_changes() {
        info!(
            "Feed written: {} live entit(ies), {} hash line(s), {} document(s) rewritten",
            report.live(),
            report.hash_entries,
            report.documents_written
        );
    } else {
        info!(
            "Feed unchanged: {} live entit(ies), indexes rewritten",
            report.live()
        );
    }
    Ok(())
}
