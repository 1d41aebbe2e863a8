//! Concurrent fetch-and-pack pipeline.
//!
//! Every request gets its own task. Tasks wait on a semaphore sized to
//! [`BuildOptions::max_concurrent`], stream their asset through an
//! [`EntryCompressor`], then hand the finished entry to the build call over a
//! bounded channel. The build call is the only owner of the [`ZipWriter`],
//! so entries are appended one at a time in completion order.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::asset::{AssetRequest, disambiguate, validate_entry_name};
use crate::config::BuildOptions;
use crate::error::{ArchiveError, FetchError, WriterError};
use crate::fetch::Fetch;
use crate::result::{ArchiveResult, SkippedAsset};
use crate::zip::{CompressedEntry, EntryCompressor, ZipWriter};

/// Result of one fetch task, tagged with the request's position.
struct FetchOutcome {
    index: usize,
    result: Result<CompressedEntry, FetchError>,
}

/// Builds ZIP archives from remote assets.
pub struct ArchiveBuilder<F: Fetch + 'static> {
    fetcher: Arc<F>,
    options: BuildOptions,
}

impl<F: Fetch + 'static> ArchiveBuilder<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_options(fetcher, BuildOptions::default())
    }

    pub fn with_options(fetcher: F, options: BuildOptions) -> Self {
        Self::from_shared(Arc::new(fetcher), options)
    }

    /// Share one fetcher (and its connection pool) between builders.
    pub fn from_shared(fetcher: Arc<F>, options: BuildOptions) -> Self {
        Self { fetcher, options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Fetch every request and pack the successful ones into one archive.
    ///
    /// Individual fetch failures are recorded in
    /// [`ArchiveResult::skipped`] and never fail the build. Errors are
    /// returned only for empty input, invalid entry names, writer failures,
    /// and (in strict mode) when nothing could be fetched.
    ///
    /// `label` only names the build in log output.
    pub async fn build_archive(
        &self,
        requests: Vec<AssetRequest>,
        label: &str,
    ) -> Result<ArchiveResult, ArchiveError> {
        if requests.is_empty() {
            return Err(ArchiveError::EmptyInput);
        }
        for request in &requests {
            validate_entry_name(&request.entry_name)?;
        }

        let requests = disambiguate(requests);
        let requested = requests.len();
        let concurrency = self.options.concurrency();

        info!(label, requested, concurrency, "building archive");

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let (tx, mut rx) = mpsc::channel::<FetchOutcome>(concurrency);
        let mut tasks = JoinSet::new();
        let mut pending: BTreeMap<usize, AssetRequest> = BTreeMap::new();

        for (index, request) in requests.into_iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            let task_request = request.clone();
            let fetch_timeout = self.options.fetch_timeout;
            let level = self.options.compression_level;

            tasks.spawn(async move {
                let Ok(permit) = semaphore.acquire_owned().await else {
                    return;
                };

                let fetch = fetch_entry(fetcher.as_ref(), &task_request, level);
                let result = match fetch_timeout {
                    Some(limit) => tokio::time::timeout(limit, fetch)
                        .await
                        .unwrap_or(Err(FetchError::Timeout(limit))),
                    None => fetch.await,
                };

                // Free the slot before a possibly blocking send
                drop(permit);
                let _ = tx.send(FetchOutcome { index, result }).await;
            });

            pending.insert(index, request);
        }
        drop(tx);

        let mut writer = ZipWriter::in_memory();
        let mut skipped = Vec::new();

        let collect = async {
            while let Some(outcome) = rx.recv().await {
                let Some(request) = pending.remove(&outcome.index) else {
                    continue;
                };
                match outcome.result {
                    Ok(entry) => {
                        debug!(
                            entry = %request.entry_name,
                            size = entry.uncompressed_size,
                            compressed = entry.data.len(),
                            "appending entry"
                        );
                        writer.append(entry)?;
                    }
                    Err(error) => {
                        warn!(url = %request.source_url, entry = %request.entry_name, %error, "skipping asset");
                        skipped.push(SkippedAsset {
                            index: outcome.index,
                            request,
                            error,
                        });
                    }
                }
            }
            Ok::<_, WriterError>(())
        };

        let deadline_hit = match self.options.deadline {
            Some(deadline) => {
                let collected = tokio::time::timeout(deadline, collect).await;
                match collected {
                    Ok(collected) => {
                        collected?;
                        false
                    }
                    Err(_) => {
                        warn!(label, ?deadline, outstanding = pending.len(), "build deadline elapsed");
                        true
                    }
                }
            }
            None => {
                collect.await?;
                false
            }
        };

        tasks.shutdown().await;

        // Whatever is still pending was cut off by the deadline or lost with its task
        for (index, request) in std::mem::take(&mut pending) {
            let error = if deadline_hit {
                FetchError::DeadlineExceeded
            } else {
                FetchError::Task("task ended without a result".to_string())
            };
            warn!(url = %request.source_url, entry = %request.entry_name, %error, "skipping asset");
            skipped.push(SkippedAsset {
                index,
                request,
                error,
            });
        }
        skipped.sort_by_key(|s| s.index);

        if writer.is_empty() && self.options.strict {
            return Err(ArchiveError::NoEntriesFetched { requested });
        }

        let entries: Vec<String> = writer.entry_names().map(str::to_string).collect();
        let bytes = writer.finish()?;

        info!(
            label,
            entries = entries.len(),
            skipped = skipped.len(),
            bytes = bytes.len(),
            "archive built"
        );

        Ok(ArchiveResult::new(bytes, entries, skipped))
    }
}

/// Stream one asset through a compressor.
async fn fetch_entry<F: Fetch + ?Sized>(
    fetcher: &F,
    request: &AssetRequest,
    level: u32,
) -> Result<CompressedEntry, FetchError> {
    let mut stream = fetcher.fetch(&request.source_url).await?;
    let mut compressor = EntryCompressor::new(request.entry_name.clone(), level);

    while let Some(chunk) = stream.next().await {
        compressor.write_chunk(&chunk?)?;
    }

    Ok(compressor.finish()?)
}
