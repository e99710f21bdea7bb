//! Single-flight pane loader.
//!
//! One `PaneLoader` per pane. `submit` may be called from any thread: user navigation,
//! programmatic navigation, and the pane's own change watcher all go through it.
//!
//! At most one enumerate+sort pass runs per pane. A submit while busy cancels the
//! in-flight generation and becomes the single pending request (latest wins). When a
//! generation finishes, for any outcome, the pending request (if any) starts next,
//! so the pane converges on the freshest request with at most one extra pass.

pub(crate) mod enrichment;
pub mod publisher;
pub(crate) mod state;

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::LoaderConfig;
use crate::error::{ListingError, PartialFailure};
use crate::ignore_poison::IgnorePoison;
use crate::listing::model::{EnrichedFields, Item, NavigationRequest, Snapshot, SourceDescriptor};
use crate::listing::sorting::{SortSpec, sort_items};
use crate::listing::source::SourceResolver;
use crate::watcher::{self, WatchTiming};
use enrichment::{EnrichmentJob, EnrichmentSink};
use publisher::{PaneEvent, Publisher};
use state::{Admission, LoaderState};

/// Sorted result of one generation, before it's accepted for publishing.
struct Loaded {
    source: SourceDescriptor,
    items: Vec<Item>,
    failures: Vec<PartialFailure>,
}

/// Watch to bind once a generation has published.
struct WatchPlan {
    generation: u64,
    location: String,
    paths: Vec<PathBuf>,
}

struct LoaderInner {
    state: Mutex<LoaderState>,
    publisher: Publisher,
    resolver: Arc<dyn SourceResolver>,
    config: LoaderConfig,
    runtime: Handle,
    live_watches: Arc<AtomicUsize>,
}

/// Coordinates listing for one pane. Cheap to clone; clones share the pane's state.
#[derive(Clone)]
pub struct PaneLoader {
    inner: Arc<LoaderInner>,
}

impl PaneLoader {
    /// Creates a loader for one pane. Must be called within a tokio runtime; background
    /// work is spawned onto that runtime even when `submit` is called from other threads.
    pub fn new(resolver: Arc<dyn SourceResolver>, config: LoaderConfig) -> Self {
        Self::with_runtime(resolver, config, Handle::current())
    }

    pub fn with_runtime(resolver: Arc<dyn SourceResolver>, config: LoaderConfig, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                state: Mutex::new(LoaderState::new(config.sort)),
                publisher: Publisher::default(),
                resolver,
                config,
                runtime,
                live_watches: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Requests that the pane show `request`. Results arrive through `subscribe`.
    pub fn submit(&self, request: NavigationRequest) {
        self.inner.submit(request);
    }

    /// Re-submits the last accepted request.
    pub fn refresh(&self) {
        let last = self.inner.state.lock_ignore_poison().last_accepted.clone();
        match last {
            Some(request) => self.submit(request.resubmitted()),
            None => log::debug!("Refresh ignored: nothing loaded yet"),
        }
    }

    /// Changes the pane's sort and reloads the last accepted request with it.
    pub fn set_sort(&self, sort: SortSpec) {
        self.inner.state.lock_ignore_poison().sort = sort;
        self.refresh();
    }

    pub fn sort(&self) -> SortSpec {
        self.inner.state.lock_ignore_poison().sort
    }

    /// Subscribes to snapshot, enrichment and failure events for this pane.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PaneEvent> {
        self.inner.publisher.subscribe()
    }

    /// The last published snapshot, with enrichment applied so far.
    pub fn current_snapshot(&self) -> Option<Snapshot> {
        self.inner.state.lock_ignore_poison().published.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.state.lock_ignore_poison().current_generation
    }

    pub fn is_busy(&self) -> bool {
        self.inner.state.lock_ignore_poison().is_busy
    }

    /// Directories currently watched for the published snapshot.
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.inner
            .state
            .lock_ignore_poison()
            .subscription
            .as_ref()
            .map(|s| s.paths().to_vec())
            .unwrap_or_default()
    }

    /// Number of attached watch subscriptions. Never more than one.
    pub fn live_watch_count(&self) -> usize {
        self.inner.live_watches.load(Ordering::SeqCst)
    }

    /// Cancels all work, detaches the watcher, and ignores later submits.
    pub fn dispose(&self) {
        self.inner.state.lock_ignore_poison().dispose();
        log::debug!("Pane loader disposed");
    }
}

impl LoaderInner {
    fn submit(self: &Arc<Self>, request: NavigationRequest) {
        let admission = self.state.lock_ignore_poison().submit(request);
        if let Some(admission) = admission {
            self.spawn_run(admission);
        }
    }

    /// Debounced watcher callback. The decision and the admission happen under one lock,
    /// so a navigation submitted concurrently can't be overwritten by a stale refresh.
    fn refresh_for_change(self: &Arc<Self>) {
        let admission = {
            let mut state = self.state.lock_ignore_poison();
            let Some(request) = state.refresh_for_change() else {
                log::debug!("Change ignored: pane is moving to another source");
                return;
            };
            log::debug!("Change detected, refreshing {}", request.location());
            state.submit(request)
        };
        if let Some(admission) = admission {
            self.spawn_run(admission);
        }
    }

    fn spawn_run(self: &Arc<Self>, admission: Admission) {
        let inner = Arc::clone(self);
        self.runtime.spawn(async move { inner.run(admission).await });
    }

    /// Runs generations back to back until no request is pending.
    async fn run(self: Arc<Self>, mut admission: Admission) {
        loop {
            log::debug!(
                "Load begin: generation={}, source={}",
                admission.generation,
                admission.request.location()
            );
            let sort = self.state.lock_ignore_poison().sort;
            let outcome = self.load(&admission, sort).await;

            let watch = {
                let mut state = self.state.lock_ignore_poison();
                self.complete(&mut state, &admission, outcome)
            };
            // Still busy here, so no other generation can publish while the watcher binds
            if let Some(plan) = watch {
                self.rewatch(plan);
            }

            let next = self.state.lock_ignore_poison().finish();

            match next {
                Some(next) => admission = next,
                None => break,
            }
        }
    }

    /// Enumerates and sorts. Never touches pane state.
    async fn load(&self, admission: &Admission, sort: SortSpec) -> Result<Loaded, ListingError> {
        let enumeration = self.resolver.enumerate(&admission.request, &admission.cancel).await?;
        if admission.cancel.is_cancelled() {
            return Err(ListingError::Cancelled);
        }

        let source = enumeration.descriptor(&admission.request);
        let failures = enumeration.failures;
        let mut items = enumeration.items;
        if !self.config.include_hidden {
            items.retain(|item| !item.is_hidden());
        }

        let items = tokio::task::spawn_blocking(move || sort_items(items, sort)).await?;

        Ok(Loaded {
            source,
            items,
            failures,
        })
    }

    /// Decides what a finished generation becomes: a snapshot, a failure, or nothing.
    /// Returns the watch to bind when a snapshot was published.
    fn complete(
        self: &Arc<Self>,
        state: &mut LoaderState,
        admission: &Admission,
        outcome: Result<Loaded, ListingError>,
    ) -> Option<WatchPlan> {
        match outcome {
            Ok(loaded) if state.is_current(admission) => {
                let snapshot = Snapshot {
                    generation: admission.generation,
                    request: admission.request.clone(),
                    source: loaded.source,
                    items: Arc::new(loaded.items),
                    failures: loaded.failures,
                };
                let paths = snapshot.source.watch_paths.clone();
                if !self.publisher.publish_snapshot(state, snapshot) {
                    return None;
                }
                self.start_enrichment(state, admission.generation);
                Some(WatchPlan {
                    generation: admission.generation,
                    location: admission.request.location(),
                    paths,
                })
            }
            Ok(_) | Err(ListingError::Cancelled) => {
                log::debug!("Dropping superseded generation {}", admission.generation);
                None
            }
            Err(e) if state.is_current(admission) => {
                log::warn!("Load failed for {}: {}", admission.request.location(), e);
                self.publisher.load_failed(state, admission.generation, e);
                None
            }
            Err(e) => {
                log::debug!("Ignoring failure of superseded generation {}: {}", admission.generation, e);
                None
            }
        }
    }

    /// Binds the watcher to the just-published source. The old subscription is detached
    /// first. Attaching spawns the notify thread and registers OS watches, so it runs
    /// outside the state lock and is swapped in only if the generation is still published.
    fn rewatch(self: &Arc<Self>, plan: WatchPlan) {
        let previous = self.state.lock_ignore_poison().subscription.take();
        drop(previous);

        if plan.paths.is_empty() {
            return;
        }

        let weak = Arc::downgrade(self);
        let timing = WatchTiming {
            raw_coalesce: self.config.raw_event_coalesce,
            quiet_period: self.config.debounce,
        };
        let on_change = move || {
            if let Some(inner) = weak.upgrade() {
                inner.refresh_for_change();
            }
        };

        let subscription =
            match watcher::attach(&self.runtime, &plan.paths, timing, Arc::clone(&self.live_watches), on_change) {
                Ok(subscription) => subscription,
                Err(e) => {
                    // Watching is an enhancement; the snapshot stands without it
                    log::warn!("Failed to start watcher for {}: {}", plan.location, e);
                    return;
                }
            };

        let mut state = self.state.lock_ignore_poison();
        if state.disposed || state.published_generation != plan.generation {
            drop(state);
            log::debug!("Discarding watcher for superseded generation {}", plan.generation);
            return;
        }
        state.subscription = Some(subscription);
    }

    fn start_enrichment(self: &Arc<Self>, state: &mut LoaderState, generation: u64) {
        let Some(snapshot) = state.published.as_ref() else {
            return;
        };
        let cancel = CancellationToken::new();
        let job = EnrichmentJob::for_items(
            generation,
            &snapshot.items,
            self.config.enrichment_item_cap,
            self.config.enrichment_walk_limit,
            cancel.clone(),
        );
        if job.targets.is_empty() {
            return;
        }

        if let Some(previous) = state.enrichment.replace(cancel) {
            previous.cancel();
        }
        let sink: Arc<dyn EnrichmentSink> = Arc::clone(self) as Arc<dyn EnrichmentSink>;
        self.runtime.spawn(enrichment::run(job, sink));
    }
}

impl EnrichmentSink for LoaderInner {
    fn apply(&self, generation: u64, index: usize, path: &str, fields: EnrichedFields) -> bool {
        let mut guard = self.state.lock_ignore_poison();
        let state = &mut *guard;
        if state.disposed || state.current_generation != generation {
            return false;
        }
        let Some(snapshot) = state.published.as_mut().filter(|s| s.generation == generation) else {
            return false;
        };

        // Copy-on-write: subscribers holding the published item list never see it change
        match Arc::make_mut(&mut snapshot.items).get_mut(index) {
            Some(item) if item.path == path => item.apply(&fields),
            _ => return true,
        }

        self.publisher.enrichment_updated(state, generation, path, fields)
    }
}

#[cfg(test)]
mod loader_test;
