//! In-memory record source

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::RecordSource;

/// Serves a fixed set of lines
///
/// For embedding the engine behind a transport the caller already owns,
/// and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRecordSource {
    lines: Vec<String>,
}

impl StaticRecordSource {
    pub fn new(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a whole registry text into lines
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }
}

#[async_trait]
impl RecordSource for StaticRecordSource {
    async fn fetch_lines(&self) -> Result<Vec<String>> {
        Ok(self.lines.clone())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}
