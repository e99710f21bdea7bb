//! Background enrichment: recursive sizes for containers after the snapshot is visible.

use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::ListingError;
use crate::listing::model::{EnrichedFields, EnrichmentStatus, Item};
use crate::listing::reading::recursive_size;

/// Receives enrichment results. Implemented by the loader.
pub(crate) trait EnrichmentSink: Send + Sync + 'static {
    /// Applies `fields` to the item at `index` if `generation` is still the pane's current
    /// published generation. Returns false once it has been superseded.
    fn apply(&self, generation: u64, index: usize, path: &str, fields: EnrichedFields) -> bool;
}

/// One item to enrich, identified by its position in the snapshot and its path.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub index: usize,
    pub path: String,
}

/// Work for one generation's snapshot.
#[derive(Debug)]
pub(crate) struct EnrichmentJob {
    pub generation: u64,
    pub targets: Vec<Target>,
    pub walk_limit: usize,
    pub cancel: CancellationToken,
}

impl EnrichmentJob {
    /// Picks pending, non-symlink containers in display order, up to `cap`.
    pub fn for_items(
        generation: u64,
        items: &[Item],
        cap: usize,
        walk_limit: usize,
        cancel: CancellationToken,
    ) -> Self {
        let targets = items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_container && !item.is_symlink && item.enrichment == EnrichmentStatus::Pending)
            .take(cap)
            .map(|(index, item)| Target {
                index,
                path: item.path.clone(),
            })
            .collect();

        Self {
            generation,
            targets,
            walk_limit,
            cancel,
        }
    }
}

/// Enriches targets one at a time, handing each result to `sink` as soon as it's ready.
///
/// Stops when the job is cancelled or the sink reports the generation superseded.
/// A failing item keeps its placeholder; the rest continue.
pub(crate) async fn run(job: EnrichmentJob, sink: Arc<dyn EnrichmentSink>) {
    let total = job.targets.len();
    let mut applied = 0usize;

    for target in job.targets {
        if job.cancel.is_cancelled() {
            break;
        }

        let token = job.cancel.clone();
        let walk_limit = job.walk_limit;
        let root = PathBuf::from(&target.path);
        let task = tokio::task::spawn_blocking(move || recursive_size(&root, walk_limit, &token));

        let result = tokio::select! {
            biased;
            _ = job.cancel.cancelled() => Err(ListingError::Cancelled),
            joined = task => joined.unwrap_or_else(|e| Err(e.into())),
        };

        match result {
            Ok(fields) => {
                if !sink.apply(job.generation, target.index, &target.path, fields) {
                    log::debug!(
                        "Enrichment for generation {} abandoned: superseded after {}/{} items",
                        job.generation,
                        applied,
                        total
                    );
                    return;
                }
                applied += 1;
            }
            Err(ListingError::Cancelled) => break,
            Err(e) => log::debug!("Enrichment failed for {}: {}", target.path, e),
        }
    }

    log::debug!(
        "Enrichment for generation {} finished: {}/{} items",
        job.generation,
        applied,
        total
    );
}
