//! Asset sources.
//!
//! A [`Fetch`] implementation turns a URL into a stream of byte chunks. The
//! builder never buffers a whole body; it compresses chunks as they arrive.

mod http;
mod local;

pub use http::HttpFetcher;
pub use local::LocalFileFetcher;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::FetchError;

/// Body of a fetched asset, delivered chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// Trait for anything that can stream the bytes behind a URL.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Start fetching `url`. Errors here mean the request itself failed;
    /// errors inside the stream mean the body broke off part way.
    async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError>;
}

/// Dispatches `http(s)://` URLs to HTTP and everything else to the local filesystem.
pub struct SourceFetcher {
    http: HttpFetcher,
    local: LocalFileFetcher,
}

impl SourceFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self {
            http: HttpFetcher::new()?,
            local: LocalFileFetcher::new(),
        })
    }
}

pub fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[async_trait]
impl Fetch for SourceFetcher {
    async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError> {
        if is_http_url(url) {
            self.http.fetch(url).await
        } else {
            self.local.fetch(url).await
        }
    }
}
