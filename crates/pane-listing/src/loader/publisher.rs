//! Delivery of pane events to subscribers.
//!
//! The publisher is the only place that decides "this is now truth for the pane". Every
//! delivery takes the loader state (so the caller must hold the state lock) and re-checks
//! the generation at call time. Because generation changes happen under the same lock,
//! subscribers see events strictly in generation order.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::error::{ListingError, PartialFailure};
use crate::ignore_poison::IgnorePoison;
use crate::listing::model::{EnrichedFields, Item, Snapshot, SourceDescriptor};
use crate::loader::state::LoaderState;

/// Event delivered to pane subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum PaneEvent {
    #[serde(rename_all = "camelCase")]
    SnapshotPublished {
        generation: u64,
        items: Arc<Vec<Item>>,
        source: SourceDescriptor,
        /// Library roots that couldn't be read. Empty for healthy sources.
        failures: Vec<PartialFailure>,
    },
    #[serde(rename_all = "camelCase")]
    EnrichmentUpdated {
        generation: u64,
        item_path: String,
        fields: EnrichedFields,
    },
    #[serde(rename_all = "camelCase")]
    LoadFailed { generation: u64, error: ListingError },
}

impl PaneEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::SnapshotPublished { generation, .. }
            | Self::EnrichmentUpdated { generation, .. }
            | Self::LoadFailed { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Publisher {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<PaneEvent>>>,
}

impl Publisher {
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PaneEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock_ignore_poison().push(tx);
        rx
    }

    /// Publishes `snapshot` if its generation is current and not yet published.
    /// Records it as the pane's snapshot. Returns whether it was delivered.
    pub fn publish_snapshot(&self, state: &mut LoaderState, snapshot: Snapshot) -> bool {
        let generation = snapshot.generation;
        if state.disposed || generation != state.current_generation || generation <= state.published_generation {
            log::debug!(
                "Publish skipped: generation={}, current={}, published={}",
                generation,
                state.current_generation,
                state.published_generation
            );
            return false;
        }

        log::info!(
            "Publishing generation {}: {} items from {}",
            generation,
            snapshot.items.len(),
            snapshot.source.location
        );

        self.deliver(PaneEvent::SnapshotPublished {
            generation,
            items: Arc::clone(&snapshot.items),
            source: snapshot.source.clone(),
            failures: snapshot.failures.clone(),
        });
        state.published_generation = generation;
        state.published = Some(snapshot);
        true
    }

    /// Delivers one enrichment update, unless the generation has been superseded.
    pub fn enrichment_updated(
        &self,
        state: &LoaderState,
        generation: u64,
        item_path: &str,
        fields: EnrichedFields,
    ) -> bool {
        if state.disposed || generation != state.current_generation || generation != state.published_generation {
            return false;
        }
        self.deliver(PaneEvent::EnrichmentUpdated {
            generation,
            item_path: item_path.to_string(),
            fields,
        });
        true
    }

    /// Reports a failed load. Stale failures from superseded generations are dropped.
    pub fn load_failed(&self, state: &LoaderState, generation: u64, error: ListingError) -> bool {
        if state.disposed || generation != state.current_generation {
            return false;
        }
        self.deliver(PaneEvent::LoadFailed { generation, error });
        true
    }

    fn deliver(&self, event: PaneEvent) {
        // Subscribers that dropped their receiver are pruned
        self.subscribers
            .lock_ignore_poison()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
