use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::asset::AssetDescriptor;

#[derive(Parser, Debug)]
#[command(name = "galleryzip")]
#[command(version)]
#[command(about = "Build ZIP archives from remote media assets", long_about = None)]
#[command(after_help = "Examples:\n  \
  galleryzip build -o beach.zip https://cdn.example.com/a.jpg sunset.png=https://cdn.example.com/b.png\n  \
  galleryzip build --manifest media.json --label media-gallery\n  \
  galleryzip list -l beach.zip")]
pub struct Cli {
    /// Increase log verbosity (-vv for debug)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode, only errors are printed
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch assets and pack them into a ZIP archive
    Build(BuildArgs),
    /// List the entries of a ZIP archive
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Assets as URL or NAME=URL (URL may also be a local path)
    #[arg(value_name = "ASSET")]
    pub assets: Vec<String>,

    /// JSON array of {url, title, filename, format} records
    #[arg(short = 'm', long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Output file, `-` for stdout (default: LABEL-<millis>.zip)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Label used for the default output name
    #[arg(short = 'l', long, default_value = "media-gallery")]
    pub label: String,

    /// Maximum concurrent fetches
    #[arg(short = 'c', long, default_value_t = crate::config::DEFAULT_MAX_CONCURRENT)]
    pub concurrency: usize,

    /// Per-asset timeout in seconds, 0 disables it
    #[arg(long, value_name = "SECS", default_value_t = crate::config::DEFAULT_FETCH_TIMEOUT.as_secs())]
    pub fetch_timeout: u64,

    /// Overall build deadline in seconds
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Fail instead of writing an empty archive when no asset could be fetched
    #[arg(long)]
    pub strict: bool,

    /// DEFLATE level, 0 stores entries uncompressed
    #[arg(long, default_value_t = crate::config::DEFAULT_COMPRESSION_LEVEL, value_parser = clap::value_parser!(u32).range(0..=9))]
    pub level: u32,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// ZIP file path
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Show sizes, ratio and timestamps
    #[arg(short = 'l', long = "long")]
    pub long: bool,
}

impl BuildArgs {
    /// Turn positional `URL` / `NAME=URL` arguments into descriptors.
    pub fn positional_descriptors(&self) -> Vec<AssetDescriptor> {
        self.assets.iter().map(|a| parse_asset_arg(a)).collect()
    }

    pub fn writes_to_stdout(&self) -> bool {
        self.output.as_deref().is_some_and(|p| p.as_os_str() == "-")
    }
}

/// `NAME=URL` unless the part before the first `=` looks like a URL, in
/// which case the whole argument is a URL (query strings contain `=`).
pub fn parse_asset_arg(arg: &str) -> AssetDescriptor {
    if let Some((name, url)) = arg.split_once('=') {
        if !name.is_empty() && !name.contains("://") && !name.contains('?') {
            return AssetDescriptor {
                url: url.to_string(),
                filename: Some(name.to_string()),
                ..Default::default()
            };
        }
    }

    AssetDescriptor {
        url: arg.to_string(),
        filename: url_basename(arg),
        ..Default::default()
    }
}

/// Last path segment of a URL or path, without query or fragment.
fn url_basename(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.split_once("://").map_or(path, |(_, rest)| {
        rest.split_once('/').map_or("", |(_, p)| p)
    });
    path.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
