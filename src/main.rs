//! Main entry point for the galleryzip CLI application.
//!
//! `build` fetches assets into a new archive; `list` shows what an archive holds.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::AsyncWriteExt;

use galleryzip::cli::{BuildArgs, Command, ListArgs};
use galleryzip::{
    ArchiveBuilder, AssetDescriptor, BuildOptions, Cli, LocalFileReader, SourceFetcher,
    ZipReader, attachment_filename, logging, requests_from_descriptors,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Command::Build(args) => build(args, cli.quiet).await,
        Command::List(args) => list(args).await,
    }
}

/// Collect assets from the manifest and positional arguments, build the
/// archive and write it out.
async fn build(args: &BuildArgs, quiet: bool) -> Result<()> {
    let mut descriptors: Vec<AssetDescriptor> = Vec::new();

    if let Some(ref manifest) = args.manifest {
        let raw = tokio::fs::read(manifest)
            .await
            .with_context(|| format!("reading manifest {}", manifest.display()))?;
        let parsed: Vec<AssetDescriptor> = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing manifest {}", manifest.display()))?;
        descriptors.extend(parsed);
    }
    descriptors.extend(args.positional_descriptors());

    if descriptors.is_empty() {
        bail!("no assets given; pass URLs or --manifest");
    }

    let options = BuildOptions::default()
        .with_max_concurrent(args.concurrency)
        .with_fetch_timeout((args.fetch_timeout > 0).then(|| Duration::from_secs(args.fetch_timeout)))
        .with_deadline(args.deadline.map(Duration::from_secs))
        .with_strict(args.strict)
        .with_compression_level(args.level);

    let builder = ArchiveBuilder::with_options(SourceFetcher::new()?, options);
    let requests = requests_from_descriptors(descriptors);
    let requested = requests.len();
    let result = builder.build_archive(requests, &args.label).await?;

    let report = !quiet && !args.writes_to_stdout();

    if args.writes_to_stdout() {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(result.bytes()).await?;
        stdout.flush().await?;
    } else {
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| attachment_filename(&args.label, SystemTime::now()).into());
        tokio::fs::write(&path, result.bytes())
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        if report {
            println!("  created: {}", path.display());
        }
    }

    if report {
        for entry in result.entries() {
            println!("   adding: {}", entry);
        }
        for skipped in result.skipped() {
            eprintln!(
                " skipping: {} ({}): {}",
                skipped.request.entry_name, skipped.request.source_url, skipped.error
            );
        }
        println!(
            "{} of {} assets, {}",
            result.entries().len(),
            requested,
            format_size(result.byte_len() as u64)
        );
    }

    Ok(())
}

/// List entries in the archive.
///
/// The long format prints a table with sizes, compression ratio and
/// timestamps followed by a totals row.
async fn list(args: &ListArgs) -> Result<()> {
    let reader = Arc::new(
        LocalFileReader::new(&args.file)
            .with_context(|| format!("opening {}", args.file.display()))?,
    );
    let entries = ZipReader::new(reader).list_files().await?;

    if !args.long {
        for entry in &entries {
            println!("{}", entry.file_name);
        }
        return Ok(());
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in &entries {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );

        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>21}  {} files",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        file_count
    );

    Ok(())
}

/// Space saved as a right-aligned percentage. Incompressible data that grew
/// reports 0%.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 || compressed >= uncompressed {
        return "  0%".to_string();
    }
    format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
}

/// Format a byte size into a human-readable string.
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
