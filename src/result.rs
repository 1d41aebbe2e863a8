//! What a build hands back to the transport layer.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::asset::AssetRequest;
use crate::error::FetchError;

/// A request that did not make it into the archive.
#[derive(Debug)]
pub struct SkippedAsset {
    /// Position of the request in the build input.
    pub index: usize,
    pub request: AssetRequest,
    pub error: FetchError,
}

/// A finished archive plus a record of what went into it.
#[derive(Debug)]
pub struct ArchiveResult {
    bytes: Vec<u8>,
    entries: Vec<String>,
    skipped: Vec<SkippedAsset>,
}

impl ArchiveResult {
    /// MIME type to send the archive with.
    pub const CONTENT_TYPE: &'static str = "application/zip";

    pub(crate) fn new(bytes: Vec<u8>, entries: Vec<String>, skipped: Vec<SkippedAsset>) -> Self {
        Self {
            bytes,
            entries,
            skipped,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Archive size in bytes, for `Content-Length`.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Entry names in archive order (completion order, not request order).
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Requests left out, sorted by their position in the input.
    pub fn skipped(&self) -> &[SkippedAsset] {
        &self.skipped
    }
}

/// Download name in the `{label}-{unix millis}.zip` form the gallery used.
///
/// Characters that would break a quoted `Content-Disposition` value are
/// replaced with `_`.
pub fn attachment_filename(label: &str, at: SystemTime) -> String {
    let millis = at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let label: String = label
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let label = if label.is_empty() { "archive" } else { label.as_str() };
    format!("{label}-{millis}.zip")
}
