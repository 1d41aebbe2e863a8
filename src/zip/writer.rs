use std::collections::HashSet;
use std::io::Write;

use crate::error::WriterError;

use super::compress::CompressedEntry;
use super::structures::{DosDateTime, EndOfCentralDirectory, EntryHeader};

/// Entry count limit of the 16-bit EOCD fields.
pub const MAX_ENTRIES: usize = u16::MAX as usize;

/// What the central directory needs to remember about a written entry.
struct CentralRecord {
    name: String,
    method: super::CompressionMethod,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    lfh_offset: u32,
}

impl CentralRecord {
    fn header(&self, timestamp: DosDateTime) -> EntryHeader<'_> {
        EntryHeader {
            name: &self.name,
            method: self.method,
            mod_time: timestamp.time,
            mod_date: timestamp.date,
            crc32: self.crc32,
            compressed_size: self.compressed_size,
            uncompressed_size: self.uncompressed_size,
        }
    }
}

/// Sequential ZIP writer.
///
/// Entries arrive already compressed and are written one after another;
/// [`finish`](Self::finish) appends the central directory and EOCD.
/// Only 32-bit archives are produced.
pub struct ZipWriter<W: Write> {
    out: W,
    position: u64,
    records: Vec<CentralRecord>,
    names: HashSet<String>,
    timestamp: DosDateTime,
}

impl ZipWriter<Vec<u8>> {
    /// Writer into a growable in-memory buffer.
    pub fn in_memory() -> Self {
        Self::new(Vec::new(), DosDateTime::now())
    }
}

impl<W: Write> ZipWriter<W> {
    pub fn new(out: W, timestamp: DosDateTime) -> Self {
        Self {
            out,
            position: 0,
            records: Vec::new(),
            names: HashSet::new(),
            timestamp,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Names of the entries written so far, in archive order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }

    pub fn append(&mut self, entry: CompressedEntry) -> Result<(), WriterError> {
        if self.records.len() >= MAX_ENTRIES {
            return Err(WriterError::TooManyEntries { max: MAX_ENTRIES });
        }
        if self.names.contains(&entry.name) {
            return Err(WriterError::DuplicateName(entry.name));
        }

        let too_large = || WriterError::EntryTooLarge {
            name: entry.name.clone(),
        };
        let compressed_size = u32::try_from(entry.data.len()).map_err(|_| too_large())?;
        let uncompressed_size = u32::try_from(entry.uncompressed_size).map_err(|_| too_large())?;
        let lfh_offset = u32::try_from(self.position).map_err(|_| WriterError::ArchiveTooLarge)?;

        let record = CentralRecord {
            name: entry.name,
            method: entry.method,
            crc32: entry.crc32,
            compressed_size,
            uncompressed_size,
            lfh_offset,
        };

        let header = record.header(self.timestamp);
        header.write_local(&mut self.out)?;
        self.out.write_all(&entry.data)?;
        self.position += (header.local_len() + entry.data.len()) as u64;

        self.names.insert(record.name.clone());
        self.records.push(record);
        Ok(())
    }

    /// Write the central directory and EOCD, returning the sink.
    pub fn finish(mut self) -> Result<W, WriterError> {
        let cd_offset = u32::try_from(self.position).map_err(|_| WriterError::ArchiveTooLarge)?;

        let mut cd_size = 0u64;
        for record in &self.records {
            let header = record.header(self.timestamp);
            header.write_central(&mut self.out, record.lfh_offset)?;
            cd_size += header.central_len() as u64;
        }

        let cd_size = u32::try_from(cd_size).map_err(|_| WriterError::ArchiveTooLarge)?;
        if cd_offset.checked_add(cd_size).is_none() {
            return Err(WriterError::ArchiveTooLarge);
        }

        // len() < MAX_ENTRIES is enforced by append
        EndOfCentralDirectory::new(self.records.len() as u16, cd_size, cd_offset)
            .write_to(&mut self.out)?;
        self.out.flush()?;

        Ok(self.out)
    }
}
