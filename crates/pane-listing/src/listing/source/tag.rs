//! Tag view: files previously associated with a tag.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

use super::Enumeration;
use crate::error::ListingError;
use crate::ignore_poison::IgnorePoisonRw;
use crate::listing::reading::get_single_entry;

/// External store mapping tag names to file paths.
pub trait TagStore: Send + Sync {
    /// Paths associated with `tag`, or `SourceUnavailable` if the tag no longer exists.
    fn paths_for_tag(&self, tag: &str) -> Result<Vec<PathBuf>, ListingError>;
}

/// In-memory tag store.
#[derive(Debug, Default)]
pub struct StaticTagStore {
    tags: RwLock<HashMap<String, Vec<PathBuf>>>,
}

impl StaticTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, tag: impl Into<String>, paths: Vec<PathBuf>) {
        self.tags.write_ignore_poison().insert(tag.into(), paths);
    }

    pub fn remove(&self, tag: &str) {
        self.tags.write_ignore_poison().remove(tag);
    }
}

impl TagStore for StaticTagStore {
    fn paths_for_tag(&self, tag: &str) -> Result<Vec<PathBuf>, ListingError> {
        self.tags
            .read_ignore_poison()
            .get(tag)
            .cloned()
            .ok_or_else(|| ListingError::unavailable(format!("tag:{}", tag), "Unknown tag"))
    }
}

/// Stats every tagged path once. Paths that no longer exist are dropped silently;
/// stale tag references are normal.
pub(super) async fn enumerate(
    store: Arc<dyn TagStore>,
    tag: String,
    cancel: &CancellationToken,
) -> Result<Enumeration, ListingError> {
    let token = cancel.clone();
    let task = tokio::task::spawn_blocking(move || -> Result<Enumeration, ListingError> {
        let paths = store.paths_for_tag(&tag)?;
        let mut out = Enumeration {
            virtual_location: Some(format!("tag:{}", tag)),
            ..Enumeration::default()
        };
        let mut parents = BTreeSet::new();
        let mut seen = HashSet::new();

        for path in paths {
            if token.is_cancelled() {
                return Err(ListingError::Cancelled);
            }
            if !seen.insert(path.clone()) {
                log::debug!("Skipping duplicate tag reference {}", path.display());
                continue;
            }
            match get_single_entry(&path) {
                Ok(item) => {
                    if let Some(parent) = path.parent() {
                        parents.insert(parent.to_path_buf());
                    }
                    out.items.push(item);
                }
                Err(e) => log::debug!("Dropping stale tag reference {}: {}", path.display(), e),
            }
        }

        out.watch_paths = parents.into_iter().collect();
        Ok(out)
    });

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ListingError::Cancelled),
        joined = task => joined?,
    }
}
