//! Built-in record sources
//!
//! Network transports live in their own crates (see `feedsync-source-http`).

use std::borrow::Cow;

pub mod file;
pub mod memory;

pub use file::{FileRecordSource, FileRecordSourceFactory};
pub use memory::StaticRecordSource;

/// Split a downloaded registry into lines
///
/// Bytes that are not valid UTF-8 (Latin-1 organization names, mostly) are
/// replaced with U+FFFD instead of failing the fetch.
pub fn decode_lines(bytes: &[u8], origin: &str) -> Vec<String> {
    let content = String::from_utf8_lossy(bytes);
    if matches!(content, Cow::Owned(_)) {
        tracing::warn!("{} is not valid UTF-8; invalid bytes were replaced", origin);
    }
    content.lines().map(str::to_string).collect()
}
