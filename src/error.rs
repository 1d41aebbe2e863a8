//! Error types for archive building.
//!
//! Only [`ArchiveError`] ever reaches the caller of
//! [`ArchiveBuilder::build_archive`](crate::ArchiveBuilder::build_archive).
//! A [`FetchError`] stays attached to the skipped entry it belongs to.

use std::time::Duration;

use thiserror::Error;

/// Fatal errors for a whole archive build.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// No asset requests were supplied.
    #[error("no assets requested")]
    EmptyInput,

    /// An entry name is not safe to place in an archive.
    #[error("invalid archive entry name {name:?}: {reason}")]
    InvalidEntryName { name: String, reason: &'static str },

    /// The archive container could not be written or finalized.
    #[error("failed to write archive: {0}")]
    Writer(#[from] WriterError),

    /// Strict mode is on and every fetch failed.
    #[error("none of the {requested} requested assets could be fetched")]
    NoEntriesFetched { requested: usize },
}

/// Errors raised by the ZIP writer.
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("entry {name:?} is too large for a 32-bit ZIP archive")]
    EntryTooLarge { name: String },

    #[error("archive exceeds the 4 GiB limit of a 32-bit ZIP archive")]
    ArchiveTooLarge,

    #[error("archive cannot hold more than {max} entries")]
    TooManyEntries { max: usize },

    #[error("duplicate entry name {0:?}")]
    DuplicateName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-entry failure. Recorded on the result, never returned as a build error.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS or protocol failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The fetch did not complete within the per-fetch timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The overall build deadline elapsed before this fetch completed.
    #[error("build deadline elapsed")]
    DeadlineExceeded,

    /// A local source could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The URL is not something any configured source can fetch.
    #[error("unsupported source {0:?}")]
    UnsupportedSource(String),

    /// The fetch task ended without producing a result.
    #[error("fetch task failed: {0}")]
    Task(String),
}
