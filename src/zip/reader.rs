use flate2::read::DeflateDecoder;
use std::io::Read;
use std::sync::Arc;

use crate::io::ReadAt;
use anyhow::{Result, bail};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Upper bound on the buffer reserved up front for one inflated entry.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Reads entries back out of an archive
pub struct ZipReader<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipReader<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Decompress an entry into memory, checking its size and CRC-32
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let data_offset = self.parser.get_data_offset(entry).await?;
        let raw = self
            .parser
            .read_range(data_offset, entry.compressed_size)
            .await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                // Header sizes are untrusted; cap the preallocation
                let hint = entry
                    .uncompressed_size
                    .min(entry.compressed_size.saturating_mul(4))
                    .min(MAX_PREALLOC);
                let mut out = Vec::with_capacity(hint as usize);
                DeflateDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
                out
            }
            CompressionMethod::Unknown(method) => {
                bail!("Unsupported compression method: {}", method)
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "Size mismatch for {}: expected {} bytes, got {}",
                entry.file_name,
                entry.uncompressed_size,
                data.len()
            );
        }

        let mut crc = flate2::Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            bail!("CRC-32 mismatch for {}", entry.file_name);
        }

        Ok(data)
    }

    /// Find an entry by exact name and decompress it
    pub async fn read_by_name(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.list_files().await?;
        match entries.iter().find(|e| e.file_name == name) {
            Some(entry) => Ok(Some(self.extract_to_memory(entry).await?)),
            None => Ok(None),
        }
    }
}
