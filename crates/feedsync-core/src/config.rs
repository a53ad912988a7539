//! Configuration types for the feed synchronization system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Classification, Organisation, Tag};

/// Main feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Where the registry is fetched from
    pub source: SourceConfig,

    /// Where the feed is published
    pub store: StoreConfig,

    /// Publishing organization stamped on new entities
    pub organisation: OrganisationConfig,

    /// Classification stamped on new entities
    #[serde(default)]
    pub classification: ClassificationConfig,

    #[serde(default)]
    pub parser: ParserConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl FeedConfig {
    /// Create a configuration with defaults for everything but the required parts
    pub fn new(source: SourceConfig, store: StoreConfig, organisation: OrganisationConfig) -> Self {
        Self {
            source,
            store,
            organisation,
            classification: ClassificationConfig::default(),
            parser: ParserConfig::default(),
            publish: PublishConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.source.validate()?;
        self.store.validate()?;
        self.organisation.validate()?;
        self.classification.validate()?;
        self.parser.validate()?;

        if self.engine.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }
}

/// Record source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Local copy of the registry
    File {
        /// Path to the delimited text file
        path: String,
    },

    /// Registry fetched over HTTP(S)
    Http {
        /// URL of the delimited text file
        url: String,
        /// Request timeout in seconds
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
    },

    /// Custom record source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("File source path cannot be empty"));
                }
                Ok(())
            }
            SourceConfig::Http { url, timeout_secs } => {
                if url.is_empty() {
                    return Err(crate::Error::config("HTTP source URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "HTTP source URL must use http or https: {}",
                        url
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("HTTP source timeout must be > 0"));
                }
                Ok(())
            }
            SourceConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom source factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Registry name of the factory that builds this source
    pub fn type_name(&self) -> &str {
        match self {
            SourceConfig::File { .. } => "file",
            SourceConfig::Http { .. } => "http",
            SourceConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Feed store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Output directory holding documents and index files
    File {
        /// Directory path
        dir: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,

    /// Custom feed store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { dir } if dir.is_empty() => {
                Err(crate::Error::config("Output directory cannot be empty"))
            }
            StoreConfig::Custom { factory, .. } if factory.is_empty() => {
                Err(crate::Error::config("Custom store factory cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Registry name of the factory that builds this store
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::File { .. } => "file",
            StoreConfig::Memory => "memory",
            StoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Publishing organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganisationConfig {
    pub name: String,
    /// Must parse as a UUID
    pub uuid: String,
}

impl OrganisationConfig {
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
        }
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        self.to_organisation().map(|_| ())
    }

    /// Resolve into the value stamped on entities
    pub fn to_organisation(&self) -> Result<Organisation, crate::Error> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::config("Organisation name cannot be empty"));
        }
        let uuid = Uuid::parse_str(self.uuid.trim()).map_err(|e| {
            crate::Error::config(format!("Organisation uuid '{}' is invalid: {}", self.uuid, e))
        })?;
        Ok(Organisation {
            name: self.name.trim().to_string(),
            uuid,
        })
    }
}

/// Classification defaults for newly created entities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// 0 = initial, 1 = ongoing, 2 = completed
    #[serde(default)]
    pub analysis: u8,

    /// 1 = high, 2 = medium, 3 = low, 4 = undefined
    #[serde(default = "default_threat_level_id")]
    pub threat_level_id: u8,

    /// Whether new entities are eligible for external distribution
    #[serde(default)]
    pub published: bool,

    /// Tag names attached to every entity
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ClassificationConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.analysis > 2 {
            return Err(crate::Error::config(format!(
                "Analysis must be 0, 1 or 2. Got: {}",
                self.analysis
            )));
        }
        if !(1..=4).contains(&self.threat_level_id) {
            return Err(crate::Error::config(format!(
                "Threat level must be between 1 and 4. Got: {}",
                self.threat_level_id
            )));
        }
        if self.tags.iter().any(|t| t.trim().is_empty()) {
            return Err(crate::Error::config("Tag names cannot be empty"));
        }
        Ok(())
    }

    pub fn to_classification(&self) -> Classification {
        Classification {
            analysis: self.analysis,
            threat_level_id: self.threat_level_id,
            tags: self
                .tags
                .iter()
                .map(|name| Tag {
                    name: name.trim().to_string(),
                })
                .collect(),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            analysis: 0,
            threat_level_id: default_threat_level_id(),
            published: false,
            tags: Vec::new(),
        }
    }
}

/// Record parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Field separator of the registry file
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl ParserConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.delimiter.is_whitespace() && self.delimiter != '\t' {
            return Err(crate::Error::config(
                "Delimiter cannot be whitespace other than tab",
            ));
        }
        Ok(())
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

/// Which entity documents a run rewrites
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    /// Only entities whose attribute set changed (or that are new)
    #[default]
    Incremental,
    /// Every live entity, changed or not
    Full,
}

/// Publisher configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub mode: PublishMode,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the sync event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    60
}

fn default_threat_level_id() -> u8 {
    1
}

fn default_delimiter() -> char {
    '|'
}

fn default_event_channel_capacity() -> usize {
    1000
}
