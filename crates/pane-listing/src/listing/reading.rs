//! Low-level directory reading and Item construction.
//!
//! Pure blocking I/O: callers run these on the blocking pool and pass the generation's
//! cancellation token, which is checked between entries.

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::error::ListingError;
use crate::listing::model::{EnrichedFields, EnrichmentStatus, Item, item_kind};

/// Lists a directory's entries (non-recursive) with cheap stat metadata.
///
/// Symlinks are reported as such and never traversed, so link cycles can't loop.
/// Entries that can't be stat'ed (permission denied, broken link) still appear with
/// minimal metadata.
pub fn list_directory_core(path: &Path, cancel: &CancellationToken) -> Result<Vec<Item>, ListingError> {
    let overall_start = std::time::Instant::now();
    let location = path.display().to_string();

    let read_dir = fs::read_dir(path).map_err(|e| ListingError::unavailable(&location, e))?;

    let mut items = Vec::new();
    for entry in read_dir {
        if cancel.is_cancelled() {
            return Err(ListingError::Cancelled);
        }
        let entry = entry.map_err(|e| ListingError::unavailable(&location, e))?;
        items.push(process_dir_entry(&entry).unwrap_or_else(|| minimal_entry(&entry)));
    }

    log::debug!(
        "list_directory_core: path={}, entries={}, total={}ms",
        path.display(),
        items.len(),
        overall_start.elapsed().as_millis()
    );

    Ok(items)
}

/// Gets metadata for a single file or directory path.
///
/// Used by sources that address files directly (tags) rather than listing a directory.
pub fn get_single_entry(path: &Path) -> Result<Item, std::io::Error> {
    let symlink_meta = fs::symlink_metadata(path)?;
    let is_symlink = symlink_meta.file_type().is_symlink();
    let target_is_dir = is_symlink && fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false);

    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());

    Ok(build_item(
        name,
        path.to_string_lossy().to_string(),
        &symlink_meta,
        is_symlink,
        target_is_dir,
    ))
}

/// Process a single directory entry into an Item.
/// Returns None if the entry cannot be processed (permissions, etc).
pub(crate) fn process_dir_entry(entry: &fs::DirEntry) -> Option<Item> {
    let file_type = entry.file_type().ok()?;
    let is_symlink = file_type.is_symlink();

    let target_is_dir = is_symlink && fs::metadata(entry.path()).map(|m| m.is_dir()).unwrap_or(false);

    let metadata = if is_symlink {
        fs::symlink_metadata(entry.path()).ok()?
    } else {
        entry.metadata().ok()?
    };

    Some(build_item(
        entry.file_name().to_string_lossy().to_string(),
        entry.path().to_string_lossy().to_string(),
        &metadata,
        is_symlink,
        target_is_dir,
    ))
}

fn build_item(name: String, path: String, metadata: &fs::Metadata, is_symlink: bool, target_is_dir: bool) -> Item {
    let is_dir = metadata.is_dir() || target_is_dir;

    let modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs());

    // Files are complete after stat. Real directories wait for the enricher;
    // symlinked directories are never walked.
    let needs_enrichment = is_dir && !is_symlink;

    Item {
        kind: item_kind(is_dir, is_symlink, &name),
        name,
        path,
        is_container: is_dir,
        is_symlink,
        size_bytes: if metadata.is_file() { Some(metadata.len()) } else { None },
        modified_at: modified,
        recursive_file_count: None,
        recursive_dir_count: None,
        enrichment: if needs_enrichment {
            EnrichmentStatus::Pending
        } else {
            EnrichmentStatus::Done
        },
    }
}

/// Permission denied or broken symlink: name and path only.
fn minimal_entry(entry: &fs::DirEntry) -> Item {
    let is_symlink = entry.file_type().map(|ft| ft.is_symlink()).unwrap_or(false);
    let name = entry.file_name().to_string_lossy().to_string();
    Item {
        kind: if is_symlink {
            "symlink-broken".to_string()
        } else {
            "file".to_string()
        },
        name,
        path: entry.path().to_string_lossy().to_string(),
        is_container: false,
        is_symlink,
        size_bytes: None,
        modified_at: None,
        recursive_file_count: None,
        recursive_dir_count: None,
        enrichment: EnrichmentStatus::Done,
    }
}

/// Walks `root` and sums file sizes, counting files and directories below it.
///
/// Doesn't follow symlinks. Checks `cancel` at every step and stops early (returning the
/// partial totals) once `limit` entries have been visited. Unreadable subtrees are skipped;
/// only an unreadable root is an error.
pub fn recursive_size(root: &Path, limit: usize, cancel: &CancellationToken) -> Result<EnrichedFields, ListingError> {
    let mut fields = EnrichedFields {
        size_bytes: 0,
        file_count: 0,
        dir_count: 0,
    };

    for (visited, entry) in WalkDir::new(root).follow_links(false).min_depth(1).into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(ListingError::Cancelled);
        }
        if visited >= limit {
            log::debug!("recursive_size: walk limit {} reached under {}", limit, root.display());
            break;
        }
        let entry = match entry {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => return Err(ListingError::unavailable(root.display().to_string(), e)),
            Err(_) => continue,
        };
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fields.dir_count += 1;
        } else if file_type.is_file() {
            fields.file_count += 1;
            fields.size_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }

    Ok(fields)
}
