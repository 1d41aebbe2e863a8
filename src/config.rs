//! Tunables for an archive build.

use std::time::Duration;

/// Default number of fetches allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum DEFLATE level, used unless overridden.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

/// Options controlling how [`ArchiveBuilder`](crate::ArchiveBuilder) fetches and packs assets.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Upper bound on concurrent fetches. Values below 1 are treated as 1.
    pub max_concurrent: usize,
    /// Time allowed for a single asset, from request to last byte.
    pub fetch_timeout: Option<Duration>,
    /// Time allowed for the whole build. Pending fetches are skipped when it elapses.
    pub deadline: Option<Duration>,
    /// Fail the build instead of returning an empty archive when every fetch fails.
    pub strict: bool,
    /// DEFLATE level, 0 (store) to 9 (best).
    pub compression_level: u32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            fetch_timeout: Some(DEFAULT_FETCH_TIMEOUT),
            deadline: None,
            strict: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl BuildOptions {
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    pub(crate) fn concurrency(&self) -> usize {
        self.max_concurrent.max(1)
    }
}
