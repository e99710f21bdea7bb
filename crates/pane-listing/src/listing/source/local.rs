//! Single local directory.

use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::Enumeration;
use crate::error::ListingError;
use crate::listing::model::Item;
use crate::listing::reading::list_directory_core;

/// Reads one directory on the blocking pool.
///
/// Returns as soon as `cancel` fires, even if the read itself is stuck (slow network
/// mounts); the blocking thread finishes on its own and its result is discarded.
pub(super) async fn read_directory(path: PathBuf, cancel: &CancellationToken) -> Result<Vec<Item>, ListingError> {
    let token = cancel.clone();
    let task = tokio::task::spawn_blocking(move || list_directory_core(&path, &token));

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ListingError::Cancelled),
        joined = task => joined?,
    }
}

pub(super) async fn enumerate(path: PathBuf, cancel: &CancellationToken) -> Result<Enumeration, ListingError> {
    let items = read_directory(path.clone(), cancel).await?;
    Ok(Enumeration {
        items,
        watch_paths: vec![path],
        failures: Vec::new(),
        virtual_location: None,
    })
}
