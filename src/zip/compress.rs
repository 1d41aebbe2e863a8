use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};
use std::io::Write;

use super::structures::CompressionMethod;

/// A fully compressed entry, ready to be appended to an archive.
#[derive(Debug)]
pub struct CompressedEntry {
    pub name: String,
    pub method: CompressionMethod,
    pub crc32: u32,
    pub uncompressed_size: u64,
    pub data: Vec<u8>,
}

enum Sink {
    Stored(Vec<u8>),
    Deflate(DeflateEncoder<Vec<u8>>),
}

/// Compresses one entry incrementally while tracking its CRC-32 and size.
///
/// Only the compressed bytes are retained, so a large body can be fed
/// chunk by chunk as it comes off the network.
pub struct EntryCompressor {
    name: String,
    sink: Sink,
    crc: Crc,
    size: u64,
}

impl EntryCompressor {
    /// `level` 0 stores the data uncompressed; 1 to 9 use DEFLATE.
    pub fn new(name: impl Into<String>, level: u32) -> Self {
        let sink = match level {
            0 => Sink::Stored(Vec::new()),
            level => Sink::Deflate(DeflateEncoder::new(
                Vec::new(),
                Compression::new(level.min(9)),
            )),
        };
        Self {
            name: name.into(),
            sink,
            crc: Crc::new(),
            size: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn write_chunk(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.crc.update(chunk);
        self.size += chunk.len() as u64;
        match &mut self.sink {
            Sink::Stored(buf) => buf.extend_from_slice(chunk),
            Sink::Deflate(encoder) => encoder.write_all(chunk)?,
        }
        Ok(())
    }

    /// Bytes consumed so far.
    pub fn uncompressed_size(&self) -> u64 {
        self.size
    }

    pub fn finish(self) -> std::io::Result<CompressedEntry> {
        let uncompressed_size = self.uncompressed_size();
        let (method, data) = match self.sink {
            Sink::Stored(buf) => (CompressionMethod::Stored, buf),
            Sink::Deflate(encoder) => (CompressionMethod::Deflate, encoder.finish()?),
        };
        Ok(CompressedEntry {
            name: self.name,
            method,
            crc32: self.crc.sum(),
            uncompressed_size,
            data,
        })
    }
}
