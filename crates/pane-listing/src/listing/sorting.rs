//! Sorting configuration and logic for pane items.

use rayon::slice::ParallelSliceMut;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::listing::model::Item;

/// Lists at least this long are sorted on the rayon pool.
const PARALLEL_SORT_THRESHOLD: usize = 10_000;

// ============================================================================
// Sorting configuration
// ============================================================================

/// Column to sort items by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    #[default]
    Name,
    Extension,
    Size,
    Modified,
    Kind,
}

/// Sort order (ascending or descending).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// How to sort containers relative to the current sort column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DirectorySortMode {
    /// Containers sort by the same column as files.
    #[default]
    LikeFiles,
    /// Containers always sort by name, regardless of the active sort column.
    AlwaysByName,
}

/// Full sort configuration of a pane.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub column: SortColumn,
    pub order: SortOrder,
    #[serde(default)]
    pub directory_mode: DirectorySortMode,
}

impl SortSpec {
    pub fn new(column: SortColumn, order: SortOrder) -> Self {
        Self {
            column,
            order,
            directory_mode: DirectorySortMode::default(),
        }
    }
}

// ============================================================================
// Sorting logic
// ============================================================================

/// Extracts file extension for sorting purposes.
/// Returns: (is_dotfile, has_extension, extension_lowercase)
/// Dotfiles (names starting with .) sort first, then files without extension, then by extension.
fn extract_extension_for_sort(name: &str) -> (bool, bool, String) {
    if name.starts_with('.') && !name[1..].contains('.') {
        return (true, false, String::new());
    }

    if let Some(dot_pos) = name.rfind('.')
        && dot_pos > 0
        && dot_pos < name.len() - 1
    {
        return (false, true, name[dot_pos + 1..].to_lowercase());
    }

    (false, false, String::new())
}

/// Compares two strings using natural (alphanumeric) sort, case-insensitive.
fn compare_names_natural(a: &str, b: &str) -> Ordering {
    alphanumeric_sort::compare_str(a.to_lowercase(), b.to_lowercase())
}

fn compare_by_extension(a: &str, b: &str) -> Ordering {
    let (a_dotfile, a_has_ext, a_ext) = extract_extension_for_sort(a);
    let (b_dotfile, b_has_ext, b_ext) = extract_extension_for_sort(b);

    match (a_dotfile, b_dotfile) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => Ordering::Equal,
        (false, false) => match (a_has_ext, b_has_ext) {
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, false) => Ordering::Equal,
            (true, true) => alphanumeric_sort::compare_str(&a_ext, &b_ext),
        },
    }
}

/// `None` (not yet known or unparsable) is the minimum value.
fn compare_optional<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(&b),
    }
}

/// Compares two items by the sort spec. Equal items keep their relative input order
/// because the sort is stable.
pub fn compare_items(a: &Item, b: &Item, spec: SortSpec) -> Ordering {
    // Containers always come first
    match (a.is_container, b.is_container) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    let column = if a.is_container && spec.directory_mode == DirectorySortMode::AlwaysByName {
        SortColumn::Name
    } else {
        spec.column
    };

    let primary = match column {
        SortColumn::Name => compare_names_natural(&a.name, &b.name),
        SortColumn::Extension => compare_by_extension(&a.name, &b.name),
        SortColumn::Size => compare_optional(a.size_bytes, b.size_bytes),
        SortColumn::Modified => compare_optional(a.modified_at, b.modified_at),
        SortColumn::Kind => a.kind.to_lowercase().cmp(&b.kind.to_lowercase()),
    };

    match spec.order {
        SortOrder::Ascending => primary,
        SortOrder::Descending => primary.reverse(),
    }
}

/// Returns `items` ordered by `spec`.
///
/// Containers always come first, then non-containers. Names use natural sorting
/// ("img_2" before "img_10"). The sort is stable: ties keep enumeration order so an
/// unchanged directory doesn't jitter between refreshes.
pub fn sort_items(mut items: Vec<Item>, spec: SortSpec) -> Vec<Item> {
    if items.len() >= PARALLEL_SORT_THRESHOLD {
        items.par_sort_by(|a, b| compare_items(a, b, spec));
    } else {
        items.sort_by(|a, b| compare_items(a, b, spec));
    }
    items
}
