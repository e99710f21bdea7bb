//! Per-pane loader state.
//!
//! Every field is read and written only while holding the pane's state mutex. The
//! transitions below are the critical sections: admission (busy check + set, or pending
//! overwrite) and completion (drain pending or go idle) each happen in one call.

use tokio_util::sync::CancellationToken;

use crate::listing::model::{NavigationRequest, Snapshot};
use crate::listing::sorting::SortSpec;
use crate::watcher::WatchSubscription;

/// An accepted request, ready to run as one generation.
#[derive(Debug, Clone)]
pub(crate) struct Admission {
    pub generation: u64,
    pub request: NavigationRequest,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
pub(crate) struct LoaderState {
    pub is_busy: bool,
    pub current_generation: u64,
    /// At most one; overwritten by later submits while busy.
    pub pending: Option<NavigationRequest>,
    /// Cancellation signal of the generation in flight.
    pub in_flight: Option<CancellationToken>,
    pub last_accepted: Option<NavigationRequest>,
    pub published: Option<Snapshot>,
    /// Highest generation delivered to subscribers.
    pub published_generation: u64,
    /// Always bound to the source of `published`.
    pub subscription: Option<WatchSubscription>,
    pub enrichment: Option<CancellationToken>,
    pub sort: SortSpec,
    pub disposed: bool,
}

impl LoaderState {
    pub fn new(sort: SortSpec) -> Self {
        Self {
            is_busy: false,
            current_generation: 0,
            pending: None,
            in_flight: None,
            last_accepted: None,
            published: None,
            published_generation: 0,
            subscription: None,
            enrichment: None,
            sort,
            disposed: false,
        }
    }

    /// Admits `request`. If idle, it starts right away as the next generation. If busy,
    /// the in-flight generation is cancelled and `request` replaces any pending one.
    pub fn submit(&mut self, request: NavigationRequest) -> Option<Admission> {
        if self.disposed {
            return None;
        }
        if self.is_busy {
            if let Some(token) = &self.in_flight {
                token.cancel();
            }
            if let Some(replaced) = self.pending.replace(request) {
                log::debug!("Pending request superseded: {}", replaced.location());
            }
            return None;
        }
        Some(self.begin(request))
    }

    /// Called once per finished generation, whatever its outcome. Starts the pending
    /// request if there is one, otherwise returns to idle.
    pub fn finish(&mut self) -> Option<Admission> {
        self.in_flight = None;
        match self.pending.take() {
            Some(next) if !self.disposed => Some(self.begin(next)),
            _ => {
                self.is_busy = false;
                None
            }
        }
    }

    /// Whether a finishing generation may still publish.
    pub fn is_current(&self, admission: &Admission) -> bool {
        !self.disposed && !admission.cancel.is_cancelled() && admission.generation == self.current_generation
    }

    /// Request a filesystem change should refresh. `None` when the pane is already moving
    /// to another source; that load attaches its own watcher when it publishes.
    pub fn refresh_for_change(&self) -> Option<NavigationRequest> {
        if self.disposed {
            return None;
        }
        let published = self.published.as_ref()?;
        let latest = self.pending.as_ref().or(self.last_accepted.as_ref())?;
        latest.same_source(&published.request).then(|| latest.resubmitted())
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
        self.pending = None;
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        if let Some(token) = self.enrichment.take() {
            token.cancel();
        }
        self.subscription = None;
    }

    fn begin(&mut self, request: NavigationRequest) -> Admission {
        // The published generation stops being current; its enrichment must stop too
        if let Some(token) = self.enrichment.take() {
            token.cancel();
        }
        self.is_busy = true;
        self.current_generation += 1;
        let cancel = CancellationToken::new();
        self.in_flight = Some(cancel.clone());
        self.last_accepted = Some(request.clone());
        Admission {
            generation: self.current_generation,
            request,
            cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> LoaderState {
        LoaderState::new(SortSpec::default())
    }

    #[test]
    fn idle_submit_begins_next_generation() {
        let mut state = state();
        let admission = state.submit(NavigationRequest::local("/a")).unwrap();
        assert_eq!(admission.generation, 1);
        assert!(state.is_busy);
        assert!(state.is_current(&admission));
    }

    #[test]
    fn busy_submit_cancels_in_flight_and_keeps_only_latest() {
        let mut state = state();
        let first = state.submit(NavigationRequest::local("/a")).unwrap();

        assert!(state.submit(NavigationRequest::local("/b")).is_none());
        assert!(state.submit(NavigationRequest::local("/c")).is_none());
        assert!(state.submit(NavigationRequest::local("/d")).is_none());

        assert!(first.cancel.is_cancelled());
        assert!(!state.is_current(&first));
        let pending = state.pending.as_ref().map(|r| r.primary_path.clone());
        assert_eq!(pending, Some(std::path::PathBuf::from("/d")));
    }

    #[test]
    fn finish_drains_pending_then_goes_idle() {
        let mut state = state();
        state.submit(NavigationRequest::local("/a")).unwrap();
        state.submit(NavigationRequest::local("/b"));

        let next = state.finish().unwrap();
        assert_eq!(next.generation, 2);
        assert_eq!(next.request.primary_path, std::path::PathBuf::from("/b"));
        assert!(state.is_busy);

        assert!(state.finish().is_none());
        assert!(!state.is_busy);
        assert!(state.in_flight.is_none());
    }

    #[test]
    fn begin_cancels_enrichment_of_previous_generation() {
        let mut state = state();
        state.submit(NavigationRequest::local("/a")).unwrap();
        state.finish();
        let enrichment = CancellationToken::new();
        state.enrichment = Some(enrichment.clone());

        state.submit(NavigationRequest::local("/b")).unwrap();
        assert!(enrichment.is_cancelled());
    }

    fn published(state: &mut LoaderState, request: NavigationRequest) {
        state.published_generation = state.current_generation;
        state.published = Some(Snapshot {
            generation: state.current_generation,
            source: crate::listing::model::SourceDescriptor {
                kind: request.kind,
                location: request.location(),
                watch_paths: Vec::new(),
            },
            request,
            items: std::sync::Arc::new(Vec::new()),
            failures: Vec::new(),
        });
    }

    #[test]
    fn change_refreshes_published_source_when_idle() {
        let mut state = state();
        let admission = state.submit(NavigationRequest::local("/a")).unwrap();
        published(&mut state, admission.request);
        state.finish();

        let refresh = state.refresh_for_change().unwrap();
        assert_eq!(refresh.primary_path, std::path::PathBuf::from("/a"));
    }

    #[test]
    fn change_is_ignored_while_navigating_elsewhere() {
        let mut state = state();
        let admission = state.submit(NavigationRequest::local("/a")).unwrap();
        published(&mut state, admission.request);
        state.finish();

        // In flight
        state.submit(NavigationRequest::local("/b")).unwrap();
        assert!(state.refresh_for_change().is_none());
    }

    #[test]
    fn change_is_ignored_when_navigation_is_pending_behind_a_refresh() {
        let mut state = state();
        let admission = state.submit(NavigationRequest::local("/a")).unwrap();
        published(&mut state, admission.request.clone());
        state.finish();

        // Refresh of /a in flight, navigation to /b queued behind it
        state.submit(admission.request.resubmitted()).unwrap();
        state.submit(NavigationRequest::local("/b"));
        assert!(state.refresh_for_change().is_none());
    }

    #[test]
    fn dispose_rejects_further_submits() {
        let mut state = state();
        let admission = state.submit(NavigationRequest::local("/a")).unwrap();
        state.submit(NavigationRequest::local("/b"));

        state.dispose();
        assert!(admission.cancel.is_cancelled());
        assert!(state.pending.is_none());
        assert!(state.finish().is_none());
        assert!(state.submit(NavigationRequest::local("/c")).is_none());
    }
}
