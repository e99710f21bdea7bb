//! Source resolution: turning a navigation request into items.
//!
//! `Resolver` dispatches on `SourceKind` to one strategy per source:
//! - `local`: one directory
//! - `aggregate`: a library of several roots, merged and deduplicated
//! - `tag`: files associated with a tag in an external store
//! - `external`: a precomputed result set (search), passed through unchanged
//!
//! Every strategy observes the generation's cancellation token.

mod aggregate;
mod external;
mod local;
mod tag;

use futures_util::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{ListingError, PartialFailure};
use crate::listing::model::{Item, NavigationRequest, SourceDescriptor, SourceKind};

pub use external::{ResultSet, ResultSetProvider, StaticResultSets};
pub use tag::{StaticTagStore, TagStore};

/// Raw, unsorted output of one enumeration.
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    pub items: Vec<Item>,
    /// Concrete local directories the items were read from. The pane watches these.
    pub watch_paths: Vec<PathBuf>,
    /// Constituents that failed without failing the whole request.
    pub failures: Vec<PartialFailure>,
    /// Virtual path identifier, for sources that aren't a directory.
    pub virtual_location: Option<String>,
}

impl Enumeration {
    pub fn descriptor(&self, request: &NavigationRequest) -> SourceDescriptor {
        SourceDescriptor {
            kind: request.kind,
            location: self.virtual_location.clone().unwrap_or_else(|| request.location()),
            watch_paths: self.watch_paths.clone(),
        }
    }
}

/// Produces items for a request, observing a cancellation signal.
///
/// Returning `ListingError::Cancelled` after `cancel` fires is expected; the loader
/// discards it silently.
pub trait SourceResolver: Send + Sync {
    fn enumerate<'a>(
        &'a self,
        request: &'a NavigationRequest,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Enumeration, ListingError>>;
}

/// Default resolver backed by the local filesystem and the given virtual-source providers.
#[derive(Clone)]
pub struct Resolver {
    tags: Arc<dyn TagStore>,
    result_sets: Arc<dyn ResultSetProvider>,
}

impl Resolver {
    pub fn new(tags: Arc<dyn TagStore>, result_sets: Arc<dyn ResultSetProvider>) -> Self {
        Self { tags, result_sets }
    }

    /// A resolver with empty tag and result-set providers. Local and library sources work normally.
    pub fn local_only() -> Self {
        Self::new(Arc::new(StaticTagStore::default()), Arc::new(StaticResultSets::default()))
    }
}

impl SourceResolver for Resolver {
    fn enumerate<'a>(
        &'a self,
        request: &'a NavigationRequest,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Enumeration, ListingError>> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(ListingError::Cancelled);
            }
            match request.kind {
                SourceKind::LocalPath => {
                    local::enumerate(request.primary_path.clone(), cancel).await
                }
                SourceKind::MultiPath => {
                    let roots = request.roots().map(PathBuf::from).collect();
                    aggregate::enumerate(roots, cancel).await
                }
                SourceKind::TagQuery => {
                    let tag = request.query_key.clone().unwrap_or_default();
                    tag::enumerate(Arc::clone(&self.tags), tag, cancel).await
                }
                SourceKind::ExternalResultSet => {
                    let key = request.query_key.clone().unwrap_or_default();
                    external::enumerate(self.result_sets.as_ref(), &key)
                }
            }
        })
    }
}
