//! Record source reading a local copy of the registry

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::decode_lines;
use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::traits::{RecordSource, RecordSourceFactory};

/// Reads the registry from a file on disk
#[derive(Debug, Clone)]
pub struct FileRecordSource {
    path: PathBuf,
}

impl FileRecordSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl RecordSource for FileRecordSource {
    async fn fetch_lines(&self) -> Result<Vec<String>> {
        let content = fs::read(&self.path).await.map_err(|e| {
            Error::source(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        tracing::debug!("Read {} bytes from {}", content.len(), self.path.display());
        Ok(decode_lines(&content, &self.path.display().to_string()))
    }

    fn source_name(&self) -> &'static str {
        "file"
    }
}

/// Factory for file record sources
pub struct FileRecordSourceFactory;

impl RecordSourceFactory for FileRecordSourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn RecordSource>> {
        match config {
            SourceConfig::File { path } => Ok(Box::new(FileRecordSource::new(path))),
            _ => Err(Error::config("Invalid config for file record source")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reads_lines_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.txt");
        fs::write(&path, "64500|A|1|192.0.2.0/24\r\n64501|B|2\n")
            .await
            .unwrap();

        let lines = FileRecordSource::new(&path).fetch_lines().await.unwrap();
        assert_eq!(lines, vec!["64500|A|1|192.0.2.0/24", "64501|B|2"]);
    }

    #[tokio::test]
    async fn latin1_file_is_read_with_replacement() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.txt");
        fs::write(&path, b"64500|Telecomunica\xe7\xf5es SA|1|192.0.2.0/24\n")
            .await
            .unwrap();

        let lines = FileRecordSource::new(&path).fetch_lines().await.unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("64500|Telecomunica\u{FFFD}\u{FFFD}es SA|1|"));
    }

    #[tokio::test]
    async fn missing_file_is_a_source_error() {
        let dir = tempdir().unwrap();
        let err = FileRecordSource::new(dir.path().join("absent.txt"))
            .fetch_lines()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Source(_)));
    }

    #[test]
    fn factory_rejects_other_configs() {
        let config = SourceConfig::Http {
            url: "https://example.org/registry.txt".to_string(),
            timeout_secs: 10,
        };
        assert!(FileRecordSourceFactory.create(&config).is_err());
    }
}
