//! Tests for single-flight coordination, using a resolver with artificial I/O delay.

use super::*;
use crate::listing::model::{EnrichmentStatus, SourceKind, item_kind};
use crate::listing::source::Enumeration;
use futures_util::future::BoxFuture;
use std::path::Path;
use std::time::Duration;

/// Resolver that sleeps before answering and records every enumeration it starts.
/// Items are named `<dir name>_<i>` so tests can tell which request produced them.
struct DelayedResolver {
    delay: Duration,
    items_per_dir: usize,
    /// When false, keeps "working" after cancellation, like I/O that can't be interrupted.
    honors_cancel: bool,
    calls: Mutex<Vec<PathBuf>>,
}

impl DelayedResolver {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            items_per_dir: 3,
            honors_cancel: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock_ignore_poison().clone()
    }
}

fn make_item(dir: &Path, name: &str, size: u64) -> Item {
    Item {
        name: name.to_string(),
        path: dir.join(name).to_string_lossy().to_string(),
        is_container: false,
        is_symlink: false,
        size_bytes: Some(size),
        modified_at: None,
        kind: item_kind(false, false, name),
        recursive_file_count: None,
        recursive_dir_count: None,
        enrichment: EnrichmentStatus::Done,
    }
}

impl SourceResolver for DelayedResolver {
    fn enumerate<'a>(
        &'a self,
        request: &'a NavigationRequest,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Enumeration, ListingError>> {
        Box::pin(async move {
            let dir = request.primary_path.clone();
            self.calls.lock_ignore_poison().push(dir.clone());

            if self.honors_cancel {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(ListingError::Cancelled),
                    _ = tokio::time::sleep(self.delay) => {}
                }
            } else {
                tokio::time::sleep(self.delay).await;
            }

            let stem = dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            if stem == "fail" {
                return Err(ListingError::unavailable(dir.display().to_string(), "Permission denied"));
            }

            let items = (0..self.items_per_dir)
                .map(|i| make_item(&dir, &format!("{}_{}", stem, i), i as u64))
                .collect();
            Ok(Enumeration {
                items,
                ..Enumeration::default()
            })
        })
    }
}

fn loader_with(resolver: Arc<DelayedResolver>) -> PaneLoader {
    PaneLoader::new(resolver, LoaderConfig::default())
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<PaneEvent>) -> PaneEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for pane event")
        .expect("publisher dropped")
}

async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<PaneEvent>, wait: Duration) {
    if let Ok(Some(event)) = tokio::time::timeout(wait, rx.recv()).await {
        panic!("unexpected event: {:?}", event);
    }
}

#[tokio::test]
async fn only_the_last_of_rapid_submits_is_published() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(100)));
    let loader = loader_with(Arc::clone(&resolver));
    let mut rx = loader.subscribe();

    for dir in ["/a", "/b", "/c", "/d"] {
        loader.submit(NavigationRequest::local(dir));
    }

    match next_event(&mut rx).await {
        PaneEvent::SnapshotPublished { generation, items, source, .. } => {
            assert_eq!(generation, 2);
            assert_eq!(source.location, "/d");
            assert!(items.iter().all(|i| i.name.starts_with("d_")));
        }
        other => panic!("expected snapshot, got {:?}", other),
    }
    assert_quiet(&mut rx, Duration::from_millis(300)).await;

    // /a started before the others arrived; /b and /c were overwritten while pending
    assert_eq!(resolver.calls(), vec![PathBuf::from("/a"), PathBuf::from("/d")]);
    assert!(!loader.is_busy());
    assert_eq!(loader.current_snapshot().map(|s| s.generation), Some(2));
}

#[tokio::test]
async fn late_result_of_cancelled_generation_is_dropped() {
    let mut resolver = DelayedResolver::new(Duration::from_millis(100));
    resolver.honors_cancel = false;
    let resolver = Arc::new(resolver);
    let loader = loader_with(Arc::clone(&resolver));
    let mut rx = loader.subscribe();

    loader.submit(NavigationRequest::local("/slow"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    loader.submit(NavigationRequest::local("/fresh"));

    match next_event(&mut rx).await {
        PaneEvent::SnapshotPublished { generation, source, .. } => {
            assert_eq!(generation, 2);
            assert_eq!(source.location, "/fresh");
        }
        other => panic!("expected snapshot, got {:?}", other),
    }
    assert_quiet(&mut rx, Duration::from_millis(300)).await;
}

#[tokio::test]
async fn published_generations_strictly_increase() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(10)));
    let loader = loader_with(resolver);
    let mut rx = loader.subscribe();

    let mut seen = Vec::new();
    for round in 0..5 {
        loader.submit(NavigationRequest::local(format!("/round{}", round)));
        if round % 2 == 0 {
            // Interleave with a burst that collapses
            loader.submit(NavigationRequest::local(format!("/burst{}", round)));
        }
        if let PaneEvent::SnapshotPublished { generation, .. } = next_event(&mut rx).await {
            seen.push(generation);
        }
    }

    assert_eq!(seen.len(), 5);
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "generations: {:?}", seen);
}

#[tokio::test]
async fn repeated_submit_of_same_request_is_idempotent() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(10)));
    let loader = loader_with(resolver);
    let mut rx = loader.subscribe();
    let request = NavigationRequest::local("/same");

    loader.submit(request.clone());
    let first = match next_event(&mut rx).await {
        PaneEvent::SnapshotPublished { items, .. } => items,
        other => panic!("expected snapshot, got {:?}", other),
    };
    loader.submit(request.resubmitted());
    let second = match next_event(&mut rx).await {
        PaneEvent::SnapshotPublished { items, .. } => items,
        other => panic!("expected snapshot, got {:?}", other),
    };

    assert_eq!(first, second);
    // Virtual test source has nothing to watch
    assert_eq!(loader.live_watch_count(), 0);
}

#[tokio::test]
async fn failure_is_reported_once_and_loader_recovers() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(10)));
    let loader = loader_with(Arc::clone(&resolver));
    let mut rx = loader.subscribe();

    loader.submit(NavigationRequest::local("/fail"));
    match next_event(&mut rx).await {
        PaneEvent::LoadFailed { generation, error } => {
            assert_eq!(generation, 1);
            assert!(matches!(error, ListingError::SourceUnavailable { .. }));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_quiet(&mut rx, Duration::from_millis(100)).await;
    // No retry
    assert_eq!(resolver.calls().len(), 1);
    assert!(!loader.is_busy());

    loader.submit(NavigationRequest::local("/ok"));
    assert!(matches!(
        next_event(&mut rx).await,
        PaneEvent::SnapshotPublished { generation: 2, .. }
    ));
}

#[tokio::test]
async fn change_in_published_source_refreshes_it_when_idle() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(10)));
    let loader = loader_with(Arc::clone(&resolver));
    let mut rx = loader.subscribe();

    loader.submit(NavigationRequest::local("/a"));
    next_event(&mut rx).await;
    loader.inner.refresh_for_change();

    match next_event(&mut rx).await {
        PaneEvent::SnapshotPublished { generation, source, .. } => {
            assert_eq!(generation, 2);
            assert_eq!(source.location, "/a");
        }
        other => panic!("expected snapshot, got {:?}", other),
    }
}

#[tokio::test]
async fn change_in_published_source_does_not_override_navigation() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(100)));
    let loader = loader_with(Arc::clone(&resolver));
    let mut rx = loader.subscribe();

    loader.submit(NavigationRequest::local("/a"));
    next_event(&mut rx).await;

    loader.submit(NavigationRequest::local("/b"));
    // The watcher on /a fires while /b is loading
    tokio::time::sleep(Duration::from_millis(20)).await;
    loader.inner.refresh_for_change();

    match next_event(&mut rx).await {
        PaneEvent::SnapshotPublished { generation, source, .. } => {
            assert_eq!(generation, 2);
            assert_eq!(source.location, "/b");
        }
        other => panic!("expected snapshot, got {:?}", other),
    }
    assert_quiet(&mut rx, Duration::from_millis(300)).await;
    assert_eq!(resolver.calls(), vec![PathBuf::from("/a"), PathBuf::from("/b")]);
}

#[tokio::test]
async fn refresh_resubmits_last_accepted_request() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(10)));
    let loader = loader_with(Arc::clone(&resolver));
    let mut rx = loader.subscribe();

    loader.refresh();
    assert_quiet(&mut rx, Duration::from_millis(50)).await;

    loader.submit(NavigationRequest::local("/docs"));
    next_event(&mut rx).await;
    loader.refresh();

    match next_event(&mut rx).await {
        PaneEvent::SnapshotPublished { generation, source, .. } => {
            assert_eq!(generation, 2);
            assert_eq!(source.location, "/docs");
            assert_eq!(source.kind, SourceKind::LocalPath);
        }
        other => panic!("expected snapshot, got {:?}", other),
    }
}

#[tokio::test]
async fn set_sort_republishes_in_new_order() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(10)));
    let loader = loader_with(resolver);
    let mut rx = loader.subscribe();

    loader.submit(NavigationRequest::local("/docs"));
    next_event(&mut rx).await;
    assert_eq!(
        loader.current_snapshot().unwrap().names(),
        vec!["docs_0", "docs_1", "docs_2"]
    );

    loader.set_sort(SortSpec::new(
        crate::listing::sorting::SortColumn::Size,
        crate::listing::sorting::SortOrder::Descending,
    ));
    next_event(&mut rx).await;
    assert_eq!(
        loader.current_snapshot().unwrap().names(),
        vec!["docs_2", "docs_1", "docs_0"]
    );
}

#[tokio::test]
async fn hidden_items_are_filtered_when_configured() {
    struct HiddenResolver;
    impl SourceResolver for HiddenResolver {
        fn enumerate<'a>(
            &'a self,
            _request: &'a NavigationRequest,
            _cancel: &'a CancellationToken,
        ) -> BoxFuture<'a, Result<Enumeration, ListingError>> {
            Box::pin(async move {
                Ok(Enumeration {
                    items: vec![make_item(Path::new("/x"), ".env", 1), make_item(Path::new("/x"), "main.rs", 2)],
                    ..Enumeration::default()
                })
            })
        }
    }

    let config = LoaderConfig {
        include_hidden: false,
        ..LoaderConfig::default()
    };
    let loader = PaneLoader::new(Arc::new(HiddenResolver), config);
    let mut rx = loader.subscribe();
    loader.submit(NavigationRequest::local("/x"));

    match next_event(&mut rx).await {
        PaneEvent::SnapshotPublished { items, .. } => {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].name, "main.rs");
        }
        other => panic!("expected snapshot, got {:?}", other),
    }
}

#[tokio::test]
async fn dispose_cancels_in_flight_and_ignores_later_submits() {
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(100)));
    let loader = loader_with(Arc::clone(&resolver));
    let mut rx = loader.subscribe();

    loader.submit(NavigationRequest::local("/a"));
    loader.submit(NavigationRequest::local("/b"));
    loader.dispose();
    loader.submit(NavigationRequest::local("/c"));

    assert_quiet(&mut rx, Duration::from_millis(300)).await;
    assert_eq!(resolver.calls(), vec![PathBuf::from("/a")]);
    assert!(!loader.is_busy());
}

#[test]
fn submit_works_from_a_non_runtime_thread() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let resolver = Arc::new(DelayedResolver::new(Duration::from_millis(10)));
    let loader = PaneLoader::with_runtime(resolver, LoaderConfig::default(), runtime.handle().clone());
    let mut rx = loader.subscribe();

    let submitter = loader.clone();
    std::thread::spawn(move || submitter.submit(NavigationRequest::local("/from_thread")))
        .join()
        .unwrap();

    let event = runtime.block_on(next_event(&mut rx));
    assert!(matches!(event, PaneEvent::SnapshotPublished { generation: 1, .. }));
}
