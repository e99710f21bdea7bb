//! Data types shared by the resolver, sorter, loader and subscribers.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::PartialFailure;

/// Where a pane's items come from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    /// A single local directory.
    LocalPath,
    /// A library: several roots merged into one view.
    MultiPath,
    /// Files previously tagged with `query_key`.
    TagQuery,
    /// A precomputed item list (search results) identified by `query_key`.
    ExternalResultSet,
}

/// One navigation trigger. Immutable; created per trigger and consumed by `submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub kind: SourceKind,
    pub primary_path: PathBuf,
    pub additional_paths: Vec<PathBuf>,
    pub query_key: Option<String>,
    pub submitted_at: SystemTime,
}

impl NavigationRequest {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: SourceKind::LocalPath,
            primary_path: path.into(),
            additional_paths: Vec::new(),
            query_key: None,
            submitted_at: SystemTime::now(),
        }
    }

    /// A library view over `roots`. The first root is the primary path.
    pub fn library(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut roots = roots.into_iter();
        let primary_path = roots.next().unwrap_or_default();
        Self {
            kind: SourceKind::MultiPath,
            primary_path,
            additional_paths: roots.collect(),
            query_key: None,
            submitted_at: SystemTime::now(),
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::TagQuery,
            primary_path: PathBuf::new(),
            additional_paths: Vec::new(),
            query_key: Some(tag.into()),
            submitted_at: SystemTime::now(),
        }
    }

    pub fn result_set(key: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::ExternalResultSet,
            primary_path: PathBuf::new(),
            additional_paths: Vec::new(),
            query_key: Some(key.into()),
            submitted_at: SystemTime::now(),
        }
    }

    /// Same source, fresh submission time. Used by refreshes.
    pub fn resubmitted(&self) -> Self {
        Self {
            submitted_at: SystemTime::now(),
            ..self.clone()
        }
    }

    /// All roots of this request, primary first.
    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.primary_path.as_path()).chain(self.additional_paths.iter().map(PathBuf::as_path))
    }

    /// Whether two requests address the same source, ignoring submission time.
    pub fn same_source(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.primary_path == other.primary_path
            && self.additional_paths == other.additional_paths
            && self.query_key == other.query_key
    }

    /// Human-readable identifier for logs and error messages.
    pub fn location(&self) -> String {
        match self.kind {
            SourceKind::LocalPath | SourceKind::MultiPath => self.primary_path.display().to_string(),
            SourceKind::TagQuery => format!("tag:{}", self.query_key.as_deref().unwrap_or_default()),
            SourceKind::ExternalResultSet => format!("results:{}", self.query_key.as_deref().unwrap_or_default()),
        }
    }
}

/// Whether expensive fields have been computed for an item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum EnrichmentStatus {
    #[default]
    Pending,
    Done,
}

/// One row in a pane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub name: String,
    /// Full path; also the item's identity within a snapshot.
    pub path: String,
    pub is_container: bool,
    pub is_symlink: bool,
    /// File size from stat, or recursive size for containers once enriched.
    pub size_bytes: Option<u64>,
    /// Unix timestamp in seconds. `None` when the platform couldn't report it.
    pub modified_at: Option<u64>,
    /// Type identifier like "dir", "symlink" or "ext:txt".
    pub kind: String,
    pub recursive_file_count: Option<u64>,
    pub recursive_dir_count: Option<u64>,
    pub enrichment: EnrichmentStatus,
}

impl Item {
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    pub(crate) fn apply(&mut self, fields: &EnrichedFields) {
        self.size_bytes = Some(fields.size_bytes);
        self.recursive_file_count = Some(fields.file_count);
        self.recursive_dir_count = Some(fields.dir_count);
        self.enrichment = EnrichmentStatus::Done;
    }
}

/// Expensive per-item fields computed by the background enricher.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedFields {
    pub size_bytes: u64,
    pub file_count: u64,
    pub dir_count: u64,
}

/// Describes the source a snapshot came from, for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    /// Directory path, or a virtual path like "tag:work" or a search result set identifier.
    pub location: String,
    /// Directories the pane watches while this snapshot is current.
    pub watch_paths: Vec<PathBuf>,
}

/// A sorted, published view of one pane.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub request: NavigationRequest,
    pub source: SourceDescriptor,
    pub items: Arc<Vec<Item>>,
    pub failures: Vec<PartialFailure>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.name.as_str()).collect()
    }
}

/// Returns a type identifier for an entry, used for the Kind column.
pub fn item_kind(is_dir: bool, is_symlink: bool, name: &str) -> String {
    if is_symlink {
        return if is_dir { "symlink-dir".to_string() } else { "symlink".to_string() };
    }
    if is_dir {
        return "dir".to_string();
    }
    match Path::new(name).extension() {
        Some(ext) => format!("ext:{}", ext.to_string_lossy().to_lowercase()),
        None => "file".to_string(),
    }
}
