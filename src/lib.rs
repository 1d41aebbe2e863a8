//! # galleryzip
//!
//! Build ZIP archives on demand from remote media assets.
//!
//! Given a list of asset URLs and the names they should have inside the
//! archive, [`ArchiveBuilder`] fetches them concurrently, compresses each body
//! as it streams in, and returns the finished archive as an in-memory buffer
//! ready to be sent as `application/zip`.
//!
//! ## Features
//!
//! - Bounded concurrent fetching over HTTP(S) or from local paths
//! - Streaming per-entry DEFLATE compression (maximum level by default)
//! - Failed fetches are skipped and reported, never fatal
//! - Per-fetch timeout, overall deadline and an optional strict mode
//! - Gallery-style entry naming with deterministic collision suffixes
//! - A ZIP reader to list and extract what was built
//!
//! ## Example
//!
//! ```no_run
//! use galleryzip::{ArchiveBuilder, AssetRequest, HttpFetcher};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let builder = ArchiveBuilder::new(HttpFetcher::new()?);
//!
//!     let result = builder
//!         .build_archive(
//!             vec![
//!                 AssetRequest::new("https://cdn.example.com/a.jpg", "beach.jpg"),
//!                 AssetRequest::new("https://cdn.example.com/b.png", "sunset.png"),
//!             ],
//!             "media-gallery",
//!         )
//!         .await?;
//!
//!     for skipped in result.skipped() {
//!         eprintln!("skipped {}: {}", skipped.request.entry_name, skipped.error);
//!     }
//!     std::fs::write("gallery.zip", result.bytes())?;
//!
//!     Ok(())
//! }
//! ```

pub mod asset;
pub mod builder;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod io;
pub mod logging;
pub mod result;
pub mod zip;

pub use asset::{AssetDescriptor, AssetRequest, requests_from_descriptors};
pub use builder::ArchiveBuilder;
pub use cli::Cli;
pub use config::BuildOptions;
pub use error::{ArchiveError, FetchError, WriterError};
pub use fetch::{ByteStream, Fetch, HttpFetcher, LocalFileFetcher, SourceFetcher};
pub use io::{LocalFileReader, MemoryReader, ReadAt};
pub use result::{ArchiveResult, SkippedAsset, attachment_filename};
pub use zip::{ZipFileEntry, ZipReader, ZipWriter};
