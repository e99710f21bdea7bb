//! Library view: several roots enumerated concurrently and merged.

use futures_util::future::join_all;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use super::Enumeration;
use super::local::read_directory;
use crate::error::{ListingError, PartialFailure};
use crate::listing::model::Item;

/// Enumerates every root concurrently, then merges in root order.
///
/// Items are deduplicated by resolved full path (overlapping roots, or a root reached
/// through a symlink). A root that fails contributes zero items and a `PartialFailure`
/// note; only when every root fails is the whole source unavailable.
pub(super) async fn enumerate(roots: Vec<PathBuf>, cancel: &CancellationToken) -> Result<Enumeration, ListingError> {
    let reads = roots.iter().map(|root| read_directory(root.clone(), cancel));
    let results = join_all(reads).await;

    if cancel.is_cancelled() {
        return Err(ListingError::Cancelled);
    }

    // Path resolution stats the filesystem
    tokio::task::spawn_blocking(move || merge(roots, results)).await?
}

fn merge(roots: Vec<PathBuf>, results: Vec<Result<Vec<Item>, ListingError>>) -> Result<Enumeration, ListingError> {
    let mut seen = HashSet::new();
    let mut out = Enumeration::default();
    let mut last_error = None;

    for (root, result) in roots.into_iter().zip(results) {
        match result {
            Ok(items) => {
                let resolved_root = resolve(&root);
                for item in items {
                    let identity = resolved_root.join(&item.name);
                    if seen.insert(identity) {
                        out.items.push(item);
                    }
                }
                out.watch_paths.push(root);
            }
            Err(ListingError::Cancelled) => return Err(ListingError::Cancelled),
            Err(e) => {
                log::warn!("Library root failed, excluding it: {}: {}", root.display(), e);
                out.failures.push(PartialFailure {
                    path: root.display().to_string(),
                    message: e.to_string(),
                });
                last_error = Some(e);
            }
        }
    }

    if out.watch_paths.is_empty()
        && let Some(e) = last_error
    {
        return Err(e);
    }

    Ok(out)
}

/// Canonical path when resolvable, otherwise the path as given.
/// Only roots are resolved; symlinked entries inside a root stay distinct items.
fn resolve(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
