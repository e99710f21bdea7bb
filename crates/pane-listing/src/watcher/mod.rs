//! Change watching for the directories behind a published snapshot.
//!
//! Raw notify events are first coalesced per path by `notify-debouncer-full` (which also
//! stitches rename pairs), then every qualifying event restarts one quiet-period timer
//! shared by all watched paths of the subscription. When the timer elapses the
//! subscription's callback fires once, however large the burst was.

mod debounce;

pub use debounce::Debouncer;

use notify_debouncer_full::{
    DebounceEventResult, Debouncer as NotifyDebouncer, RecommendedCache, new_debouncer,
    notify::{EventKind, RecommendedWatcher, RecursiveMode},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;

use crate::error::WatchError;

/// Timing for a subscription.
#[derive(Debug, Clone, Copy)]
pub struct WatchTiming {
    /// Window used by notify-debouncer-full to merge raw events per path.
    pub raw_coalesce: Duration,
    /// Quiet period before the refresh callback fires.
    pub quiet_period: Duration,
}

/// A live watch over one or more directories. Dropping it detaches the OS watcher
/// and discards any refresh still waiting for its quiet period.
pub struct WatchSubscription {
    paths: Vec<PathBuf>,
    // Field order matters: the OS watcher (holding a notifier) goes first
    _watcher: NotifyDebouncer<RecommendedWatcher, RecommendedCache>,
    _debouncer: Debouncer,
    live: Arc<AtomicUsize>,
}

impl WatchSubscription {
    /// Directories actually being watched.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl std::fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSubscription").field("paths", &self.paths).finish()
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        log::debug!("Watcher detached from {} path(s)", self.paths.len());
    }
}

/// Whether an event kind should trigger a refresh (create, delete, rename, modify).
fn is_qualifying(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(_) | EventKind::Any
    )
}

/// Watches `paths` (non-recursively) and calls `on_change` once per quiet period.
///
/// Paths that can't be watched are logged and skipped; only when none can be watched
/// is an error returned. `live` counts attached subscriptions for the owner.
pub fn attach<F>(
    runtime: &Handle,
    paths: &[PathBuf],
    timing: WatchTiming,
    live: Arc<AtomicUsize>,
    on_change: F,
) -> Result<WatchSubscription, WatchError>
where
    F: Fn() + Send + 'static,
{
    let debouncer = Debouncer::spawn(runtime, timing.quiet_period, on_change);
    let notifier = debouncer.notifier();

    let mut watcher = new_debouncer(timing.raw_coalesce, None, move |result: DebounceEventResult| match result {
        Ok(events) => {
            if events.iter().any(|e| is_qualifying(&e.event.kind)) {
                let _ = notifier.send(());
            }
        }
        Err(errors) => {
            // Errors often mean the watched directory itself went away.
            // A refresh will surface that as an unavailable source.
            for e in &errors {
                log::warn!("Watcher error: {}", e);
            }
            let _ = notifier.send(());
        }
    })?;

    let mut watched = Vec::with_capacity(paths.len());
    let mut last_error = None;
    for path in paths {
        match watcher.watch(path, RecursiveMode::NonRecursive) {
            Ok(()) => watched.push(path.clone()),
            Err(e) => {
                log::warn!("Failed to watch {}: {}", path.display(), e);
                last_error = Some(e);
            }
        }
    }

    if watched.is_empty()
        && let Some(e) = last_error
    {
        return Err(e.into());
    }

    live.fetch_add(1, Ordering::SeqCst);
    log::debug!("Watcher attached to {}", describe(&watched));

    Ok(WatchSubscription {
        paths: watched,
        _watcher: watcher,
        _debouncer: debouncer,
        live,
    })
}

fn describe(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}
