//! Directory listing: item model, reading, sorting, and source strategies.

pub mod model;
pub(crate) mod reading;
pub mod sorting;
pub mod source;

pub use model::{EnrichedFields, EnrichmentStatus, Item, NavigationRequest, Snapshot, SourceDescriptor, SourceKind};
pub use reading::{get_single_entry, list_directory_core, recursive_size};
pub use sorting::{DirectorySortMode, SortColumn, SortOrder, SortSpec, sort_items};
pub use source::{
    Enumeration, Resolver, ResultSet, ResultSetProvider, SourceResolver, StaticResultSets, StaticTagStore, TagStore,
};
