//! ZIP archive writing and reading.
//!
//! ## Architecture
//!
//! - [`structures`]: ZIP format records (EOCD, local and central headers, DOS timestamps)
//! - [`compress`]: incremental per-entry DEFLATE with CRC-32 tracking
//! - [`writer`]: sequential archive writer producing a 32-bit ZIP
//! - [`parser`]: low-level parsing of ZIP structures from a [`ReadAt`](crate::io::ReadAt) source
//! - [`reader`]: entry listing and extraction on top of the parser
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! Because sizes and CRC are known before an entry is written (it is
//! compressed in full first), local headers carry final values and no data
//! descriptors are emitted.
//!
//! ## Limitations
//!
//! - Writing is limited to 65535 entries and 4 GiB; reading understands ZIP64
//! - STORED and DEFLATE only, no encryption, no multi-disk archives

mod compress;
mod parser;
mod reader;
mod structures;
mod writer;

pub use compress::{CompressedEntry, EntryCompressor};
pub use parser::ZipParser;
pub use reader::ZipReader;
pub use structures::*;
pub use writer::{MAX_ENTRIES, ZipWriter};
