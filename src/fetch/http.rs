use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Client;
use std::time::Duration;

use super::{ByteStream, Fetch};
use crate::error::FetchError;

/// Time allowed to establish a connection. The whole-fetch timeout is
/// enforced by the builder so that it also covers slow bodies.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Streams assets over HTTP(S) with a plain GET
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// Use an already configured client (proxies, custom TLS roots, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError> {
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        tracing::debug!(url, content_length = ?resp.content_length(), "asset response");

        Ok(Box::pin(resp.bytes_stream().map_err(FetchError::from)))
    }
}
