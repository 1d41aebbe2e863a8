use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use galleryzip::{
    ArchiveBuilder, ArchiveError, AssetRequest, BuildOptions, ByteStream, Fetch, FetchError,
    MemoryReader, ZipReader,
};

#[derive(Clone)]
enum Behaviour {
    Serve { body: Vec<u8>, delay: Duration },
    Status(u16),
    BreakMidStream { body: Vec<u8> },
    Hang,
}

#[derive(Default)]
struct MockFetcher {
    assets: HashMap<String, Behaviour>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockFetcher {
    fn serve(mut self, url: &str, body: &[u8], delay_ms: u64) -> Self {
        self.assets.insert(
            url.to_string(),
            Behaviour::Serve {
                body: body.to_vec(),
                delay: Duration::from_millis(delay_ms),
            },
        );
        self
    }

    fn with(mut self, url: &str, behaviour: Behaviour) -> Self {
        self.assets.insert(url.to_string(), behaviour);
        self
    }
}

fn chunked(body: Vec<u8>, tail: Option<FetchError>) -> ByteStream {
    let mut items: Vec<Result<Bytes, FetchError>> = body
        .chunks(1024)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    if let Some(err) = tail {
        items.push(Err(err));
    }
    Box::pin(futures::stream::iter(items))
}

#[async_trait]
impl Fetch for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let Some(behaviour) = self.assets.get(url).cloned() else {
            return Err(FetchError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "unreachable",
            )));
        };

        match behaviour {
            Behaviour::Serve { body, delay } => {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(chunked(body, None))
            }
            Behaviour::Status(code) => Err(FetchError::Status(code)),
            Behaviour::BreakMidStream { body } => Ok(chunked(
                body,
                Some(FetchError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "reset",
                ))),
            )),
            Behaviour::Hang => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

fn body_for(name: &str) -> Vec<u8> {
    name.bytes().cycle().take(5_000 + name.len() * 97).collect()
}

fn url(name: &str) -> String {
    format!("https://cdn.example.com/{name}")
}

async fn unpack(bytes: &[u8]) -> HashMap<String, Vec<u8>> {
    let reader = ZipReader::new(Arc::new(MemoryReader::new(bytes.to_vec())));
    let mut out = HashMap::new();
    for entry in reader.list_files().await.unwrap() {
        let data = reader.extract_to_memory(&entry).await.unwrap();
        assert!(out.insert(entry.file_name, data).is_none(), "duplicate entry");
    }
    out
}

fn names(set: &[&str]) -> BTreeSet<String> {
    set.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn all_reachable_assets_are_packed_byte_for_byte() {
    let files = ["a.jpg", "b.png", "c.jpg", "d.jpeg", "e.png"];
    let mut fetcher = MockFetcher::default();
    for (i, f) in files.iter().enumerate() {
        fetcher = fetcher.serve(&url(f), &body_for(f), (5 - i as u64) * 10);
    }
    let builder = ArchiveBuilder::new(fetcher);

    let requests = files.iter().map(|f| AssetRequest::new(url(f), *f)).collect();
    let result = builder.build_archive(requests, "media-gallery").await.unwrap();

    assert!(result.skipped().is_empty());
    assert_eq!(result.byte_len(), result.bytes().len());

    let unpacked = unpack(result.bytes()).await;
    assert_eq!(unpacked.keys().cloned().collect::<BTreeSet<_>>(), names(&files));
    assert_eq!(
        result.entries().iter().cloned().collect::<BTreeSet<_>>(),
        names(&files)
    );
    for f in files {
        assert_eq!(unpacked[f], body_for(f), "content of {f}");
    }
}

#[tokio::test]
async fn empty_input_is_rejected() {
    let fetcher = Arc::new(MockFetcher::default());
    let builder = ArchiveBuilder::from_shared(Arc::clone(&fetcher), BuildOptions::default());

    let err = builder.build_archive(Vec::new(), "x").await.unwrap_err();

    assert!(matches!(err, ArchiveError::EmptyInput));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn one_unreachable_asset_is_skipped() {
    let fetcher = MockFetcher::default()
        .serve(&url("a.jpg"), b"aaa", 0)
        .serve(&url("c.jpg"), b"ccc", 0);
    let builder = ArchiveBuilder::new(fetcher);

    let requests = vec![
        AssetRequest::new(url("a.jpg"), "a.jpg"),
        AssetRequest::new("https://unreachable.invalid/b.jpg", "b.jpg"),
        AssetRequest::new(url("c.jpg"), "c.jpg"),
    ];
    let result = builder.build_archive(requests, "x").await.unwrap();

    let unpacked = unpack(result.bytes()).await;
    assert_eq!(unpacked.len(), 2);
    assert!(!unpacked.contains_key("b.jpg"));

    assert_eq!(result.skipped().len(), 1);
    let skipped = &result.skipped()[0];
    assert_eq!(skipped.index, 1);
    assert_eq!(skipped.request.entry_name, "b.jpg");
    assert!(matches!(skipped.error, FetchError::Io(_)));
}

#[tokio::test]
async fn all_failures_give_valid_empty_archive() {
    let fetcher = MockFetcher::default()
        .with(&url("a.jpg"), Behaviour::Status(404))
        .with(&url("b.jpg"), Behaviour::Status(500));
    let builder = ArchiveBuilder::new(fetcher);

    let requests = vec![
        AssetRequest::new(url("a.jpg"), "a.jpg"),
        AssetRequest::new(url("b.jpg"), "b.jpg"),
    ];
    let result = builder.build_archive(requests, "x").await.unwrap();

    assert!(result.entries().is_empty());
    assert_eq!(result.skipped().len(), 2);
    assert_eq!(result.byte_len(), 22);
    assert!(unpack(result.bytes()).await.is_empty());
}

#[tokio::test]
async fn strict_mode_fails_when_nothing_was_fetched() {
    let fetcher = MockFetcher::default().with(&url("a.jpg"), Behaviour::Status(403));
    let builder =
        ArchiveBuilder::with_options(fetcher, BuildOptions::default().with_strict(true));

    let err = builder
        .build_archive(vec![AssetRequest::new(url("a.jpg"), "a.jpg")], "x")
        .await
        .unwrap_err();

    assert!(matches!(err, ArchiveError::NoEntriesFetched { requested: 1 }));
}

#[tokio::test]
async fn strict_mode_allows_partial_success() {
    let fetcher = MockFetcher::default().serve(&url("a.jpg"), b"a", 0);
    let builder =
        ArchiveBuilder::with_options(fetcher, BuildOptions::default().with_strict(true));

    let result = builder
        .build_archive(
            vec![
                AssetRequest::new(url("a.jpg"), "a.jpg"),
                AssetRequest::new(url("gone.jpg"), "gone.jpg"),
            ],
            "x",
        )
        .await
        .unwrap();

    assert_eq!(result.entries(), ["a.jpg"]);
}

#[tokio::test]
async fn completion_order_does_not_change_entry_set() {
    let files = ["1.jpg", "2.jpg", "3.jpg", "4.jpg"];

    let mut sets = Vec::new();
    for reversed in [false, true] {
        let mut fetcher = MockFetcher::default();
        for (i, f) in files.iter().enumerate() {
            let rank = if reversed { files.len() - i } else { i + 1 };
            fetcher = fetcher.serve(&url(f), &body_for(f), rank as u64 * 15);
        }
        let builder = ArchiveBuilder::new(fetcher);
        let requests = files.iter().map(|f| AssetRequest::new(url(f), *f)).collect();
        let result = builder.build_archive(requests, "x").await.unwrap();

        let unpacked = unpack(result.bytes()).await;
        sets.push(unpacked.into_keys().collect::<BTreeSet<_>>());
    }

    assert_eq!(sets[0], sets[1]);
    assert_eq!(sets[0], names(&files));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_builds_do_not_mix_entries() {
    let mut fetcher = MockFetcher::default();
    for f in ["a1.jpg", "a2.jpg", "a3.jpg", "b1.jpg", "b2.jpg", "b3.jpg"] {
        fetcher = fetcher.serve(&url(f), &body_for(f), 10);
    }
    let builder = Arc::new(ArchiveBuilder::new(fetcher));

    let build = |prefix: &'static str| {
        let builder = Arc::clone(&builder);
        async move {
            let requests = (1..=3)
                .map(|i| {
                    let name = format!("{prefix}{i}.jpg");
                    AssetRequest::new(url(&name), name)
                })
                .collect();
            builder.build_archive(requests, prefix).await.unwrap()
        }
    };

    let (a, b) = tokio::join!(tokio::spawn(build("a")), tokio::spawn(build("b")));
    let (a, b) = (a.unwrap(), b.unwrap());

    let a = unpack(a.bytes()).await;
    let b = unpack(b.bytes()).await;
    assert_eq!(
        a.keys().cloned().collect::<BTreeSet<_>>(),
        names(&["a1.jpg", "a2.jpg", "a3.jpg"])
    );
    assert_eq!(
        b.keys().cloned().collect::<BTreeSet<_>>(),
        names(&["b1.jpg", "b2.jpg", "b3.jpg"])
    );
    assert_eq!(a["a2.jpg"], body_for("a2.jpg"));
    assert_eq!(b["b2.jpg"], body_for("b2.jpg"));
}

#[tokio::test]
async fn concurrency_ceiling_is_respected() {
    let mut fetcher = MockFetcher::default();
    let mut requests = Vec::new();
    for i in 0..12 {
        let name = format!("{i}.jpg");
        fetcher = fetcher.serve(&url(&name), b"x", 20);
        requests.push(AssetRequest::new(url(&name), name));
    }
    let fetcher = Arc::new(fetcher);
    let builder = ArchiveBuilder::from_shared(
        Arc::clone(&fetcher),
        BuildOptions::default().with_max_concurrent(3),
    );

    let result = builder.build_archive(requests, "x").await.unwrap();

    assert_eq!(result.entries().len(), 12);
    let peak = fetcher.max_in_flight.load(Ordering::SeqCst);
    assert!((1..=3).contains(&peak), "peak concurrency was {peak}");
}

#[tokio::test]
async fn zero_concurrency_still_makes_progress() {
    let fetcher = MockFetcher::default().serve(&url("a.jpg"), b"a", 0);
    let builder =
        ArchiveBuilder::with_options(fetcher, BuildOptions::default().with_max_concurrent(0));

    let result = builder
        .build_archive(vec![AssetRequest::new(url("a.jpg"), "a.jpg")], "x")
        .await
        .unwrap();

    assert_eq!(result.entries(), ["a.jpg"]);
}

#[tokio::test]
async fn slow_fetch_is_skipped_after_timeout() {
    let fetcher = MockFetcher::default()
        .serve(&url("fast.jpg"), b"fast", 0)
        .serve(&url("slow.jpg"), b"slow", 5_000);
    let builder = ArchiveBuilder::with_options(
        fetcher,
        BuildOptions::default().with_fetch_timeout(Some(Duration::from_millis(100))),
    );

    let result = builder
        .build_archive(
            vec![
                AssetRequest::new(url("fast.jpg"), "fast.jpg"),
                AssetRequest::new(url("slow.jpg"), "slow.jpg"),
            ],
            "x",
        )
        .await
        .unwrap();

    assert_eq!(result.entries(), ["fast.jpg"]);
    assert_eq!(result.skipped().len(), 1);
    assert!(matches!(result.skipped()[0].error, FetchError::Timeout(_)));
}

#[tokio::test]
async fn deadline_cuts_off_pending_fetches() {
    let fetcher = MockFetcher::default()
        .serve(&url("a.jpg"), b"a", 0)
        .with(&url("stuck.jpg"), Behaviour::Hang);
    let builder = ArchiveBuilder::with_options(
        fetcher,
        BuildOptions::default()
            .with_fetch_timeout(None)
            .with_deadline(Some(Duration::from_millis(200))),
    );

    let result = builder
        .build_archive(
            vec![
                AssetRequest::new(url("a.jpg"), "a.jpg"),
                AssetRequest::new(url("stuck.jpg"), "stuck.jpg"),
            ],
            "x",
        )
        .await
        .unwrap();

    assert_eq!(result.entries(), ["a.jpg"]);
    assert_eq!(result.skipped().len(), 1);
    assert_eq!(result.skipped()[0].request.entry_name, "stuck.jpg");
    assert!(matches!(result.skipped()[0].error, FetchError::DeadlineExceeded));
    assert_eq!(unpack(result.bytes()).await.len(), 1);
}

#[tokio::test]
async fn broken_stream_is_skipped() {
    let fetcher = MockFetcher::default()
        .serve(&url("ok.jpg"), b"ok", 0)
        .with(
            &url("broken.jpg"),
            Behaviour::BreakMidStream {
                body: vec![7u8; 4096],
            },
        );
    let builder = ArchiveBuilder::new(fetcher);

    let result = builder
        .build_archive(
            vec![
                AssetRequest::new(url("ok.jpg"), "ok.jpg"),
                AssetRequest::new(url("broken.jpg"), "broken.jpg"),
            ],
            "x",
        )
        .await
        .unwrap();

    assert_eq!(result.entries(), ["ok.jpg"]);
    assert!(!unpack(result.bytes()).await.contains_key("broken.jpg"));
}

#[tokio::test]
async fn duplicate_names_are_suffixed_not_overwritten() {
    let fetcher = MockFetcher::default()
        .serve(&url("one"), b"first", 0)
        .serve(&url("two"), b"second", 0);
    let builder = ArchiveBuilder::new(fetcher);

    let result = builder
        .build_archive(
            vec![
                AssetRequest::new(url("one"), "Beach_1.jpg"),
                AssetRequest::new(url("two"), "Beach_1.jpg"),
            ],
            "x",
        )
        .await
        .unwrap();

    let unpacked = unpack(result.bytes()).await;
    assert_eq!(unpacked["Beach_1.jpg"], b"first");
    assert_eq!(unpacked["Beach_1-2.jpg"], b"second");
}

#[tokio::test]
async fn traversal_name_fails_before_any_fetch() {
    let fetcher = Arc::new(MockFetcher::default().serve(&url("a.jpg"), b"a", 0));
    let builder = ArchiveBuilder::from_shared(Arc::clone(&fetcher), BuildOptions::default());

    let err = builder
        .build_archive(
            vec![
                AssetRequest::new(url("a.jpg"), "a.jpg"),
                AssetRequest::new(url("a.jpg"), "../../etc/cron.d/evil"),
            ],
            "x",
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ArchiveError::InvalidEntryName { .. }));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stored_level_round_trips() {
    let fetcher = MockFetcher::default().serve(&url("a.bin"), &body_for("a.bin"), 0);
    let builder = ArchiveBuilder::with_options(
        fetcher,
        BuildOptions::default().with_compression_level(0),
    );

    let result = builder
        .build_archive(vec![AssetRequest::new(url("a.bin"), "a.bin")], "x")
        .await
        .unwrap();

    let reader = ZipReader::new(Arc::new(MemoryReader::new(result.into_bytes())));
    let entries = reader.list_files().await.unwrap();
    assert_eq!(entries[0].compression_method.as_u16(), 0);
    assert_eq!(
        reader.extract_to_memory(&entries[0]).await.unwrap(),
        body_for("a.bin")
    );
}
