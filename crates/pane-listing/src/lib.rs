// Deny unused code to catch dead code early
#![deny(unused)]
// Warn on unused dependencies to catch cfg mismatches
#![warn(unused_crate_dependencies)]
// Warn on redundant path prefixes (e.g., std::path::Path when Path is imported)
#![warn(unused_qualifications)]
// Use log::* macros instead of println!/eprintln! for proper log level control
#![deny(clippy::print_stdout, clippy::print_stderr)]

//! Directory listing for file manager panes.
//!
//! A [`PaneLoader`] turns navigation requests (a folder, a library of folders, a tag, a
//! search result set) into sorted snapshots for one pane. It runs at most one load at a
//! time, lets the latest request win, refreshes automatically when watched directories
//! change, and fills in recursive directory sizes in the background.
//!
//! ```no_run
//! # async fn demo() {
//! use pane_listing::{LoaderConfig, NavigationRequest, PaneEvent, PaneLoader, Resolver};
//! use std::sync::Arc;
//!
//! let loader = PaneLoader::new(Arc::new(Resolver::local_only()), LoaderConfig::from_env());
//! let mut events = loader.subscribe();
//! loader.submit(NavigationRequest::local("/tmp"));
//! while let Some(event) = events.recv().await {
//!     if let PaneEvent::SnapshotPublished { items, .. } = event {
//!         log::info!("{} items", items.len());
//!     }
//! }
//! # }
//! ```

//noinspection RsUnusedImport
// Silence false positives for dev dependencies (used only in benches/, not lib)
#[cfg(test)]
use criterion as _;
//noinspection RsUnusedImport
// env_logger is used by the pane-watch binary
use env_logger as _;

pub mod config;
pub mod error;
pub(crate) mod ignore_poison;
pub mod listing;
pub mod loader;
pub mod watcher;

pub use config::{ListingSettings, LoaderConfig};
pub use error::{ListingError, PartialFailure, WatchError};
pub use listing::{
    DirectorySortMode, EnrichedFields, EnrichmentStatus, Item, NavigationRequest, Resolver, ResultSet,
    ResultSetProvider, Snapshot, SortColumn, SortOrder, SortSpec, SourceDescriptor, SourceKind, SourceResolver,
    StaticResultSets, StaticTagStore, TagStore,
};
pub use loader::PaneLoader;
pub use loader::publisher::PaneEvent;
