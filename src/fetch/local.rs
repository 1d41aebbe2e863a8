use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::{ByteStream, Fetch};
use crate::error::FetchError;

const CHUNK_SIZE: usize = 64 * 1024;

/// Reads assets from the local filesystem.
///
/// Accepts `file://` URLs as well as plain paths.
#[derive(Debug, Default)]
pub struct LocalFileFetcher;

impl LocalFileFetcher {
    pub fn new() -> Self {
        Self
    }

    fn path_for(url: &str) -> Result<PathBuf, FetchError> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        if path.is_empty() || path.contains("://") {
            return Err(FetchError::UnsupportedSource(url.to_string()));
        }
        Ok(PathBuf::from(path))
    }
}

#[async_trait]
impl Fetch for LocalFileFetcher {
    async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError> {
        let path = Self::path_for(url)?;
        let file = File::open(&path).await?;

        let stream = futures::stream::try_unfold(file, |mut file| async move {
            let mut buf = vec![0u8; CHUNK_SIZE];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok::<_, FetchError>(None);
            }
            buf.truncate(n);
            Ok(Some((Bytes::from(buf), file)))
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::io::Write;

    #[tokio::test]
    async fn reads_file_url_in_chunks() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        tmp.write_all(&data).unwrap();

        let url = format!("file://{}", tmp.path().display());
        let chunks: Vec<Bytes> = LocalFileFetcher::new()
            .fetch(&url)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = LocalFileFetcher::new()
            .fetch("/definitely/not/here.jpg")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::Io(_)));
    }

    #[tokio::test]
    async fn foreign_scheme_is_rejected() {
        let err = LocalFileFetcher::new()
            .fetch("ftp://example.com/a.jpg")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::UnsupportedSource(_)));
    }
}
