//! Loader tuning configuration.
//!
//! Priority: environment variables > settings file > defaults. None of these values
//! affect correctness; they bound refresh frequency and enrichment cost.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::listing::sorting::{DirectorySortMode, SortColumn, SortOrder, SortSpec};

/// Default quiet period before a burst of filesystem events triggers a refresh.
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Default window the raw notify debouncer uses to stitch rename pairs and dedupe per-path events.
pub const DEFAULT_RAW_COALESCE_MS: u64 = 50;

/// Default number of items the background enricher looks at per snapshot.
pub const DEFAULT_ENRICHMENT_ITEM_CAP: usize = 1000;

/// Default number of entries a single recursive-size walk may visit.
pub const DEFAULT_ENRICHMENT_WALK_LIMIT: usize = 200_000;

/// Runtime configuration for one pane loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Quiet period that must pass with no filesystem events before a refresh fires.
    pub debounce: Duration,
    /// Coalescing window for raw notify events (rename stitching, per-path dedupe).
    pub raw_event_coalesce: Duration,
    /// Max number of items enriched per snapshot.
    pub enrichment_item_cap: usize,
    /// Max entries visited by one recursive folder-size walk.
    pub enrichment_walk_limit: usize,
    /// Whether dot-prefixed entries are listed.
    pub include_hidden: bool,
    /// Initial sort for the pane.
    pub sort: SortSpec,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            raw_event_coalesce: Duration::from_millis(DEFAULT_RAW_COALESCE_MS),
            enrichment_item_cap: DEFAULT_ENRICHMENT_ITEM_CAP,
            enrichment_walk_limit: DEFAULT_ENRICHMENT_WALK_LIMIT,
            include_hidden: true,
            sort: SortSpec::default(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from environment variables only.
    pub fn from_env() -> Self {
        Self::from_settings_and_env(&ListingSettings::default())
    }

    /// Load configuration with priority: env vars > user settings > defaults.
    pub fn from_settings_and_env(settings: &ListingSettings) -> Self {
        let defaults = Self::default();

        let debounce_ms = env_parse::<u64>("PANE_LISTING_DEBOUNCE_MS")
            .or(settings.debounce_ms)
            .unwrap_or(DEFAULT_DEBOUNCE_MS);

        let raw_coalesce_ms = env_parse::<u64>("PANE_LISTING_RAW_COALESCE_MS")
            .or(settings.raw_coalesce_ms)
            .unwrap_or(DEFAULT_RAW_COALESCE_MS);

        let enrichment_item_cap = env_parse::<usize>("PANE_LISTING_ENRICHMENT_CAP")
            .or(settings.enrichment_item_cap)
            .unwrap_or(defaults.enrichment_item_cap);

        let enrichment_walk_limit = env_parse::<usize>("PANE_LISTING_WALK_LIMIT")
            .or(settings.enrichment_walk_limit)
            .unwrap_or(defaults.enrichment_walk_limit);

        let include_hidden = env::var("PANE_LISTING_SHOW_HIDDEN")
            .ok()
            .map(|v| v == "true" || v == "1")
            .unwrap_or(settings.show_hidden_files);

        Self {
            debounce: Duration::from_millis(debounce_ms),
            raw_event_coalesce: Duration::from_millis(raw_coalesce_ms),
            enrichment_item_cap,
            enrichment_walk_limit,
            include_hidden,
            sort: SortSpec {
                column: settings.sort_by,
                order: settings.sort_order,
                directory_mode: settings.directory_sort_mode,
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Persisted user settings relevant to listing.
/// Accepts both flat dot-notation keys (like "listing.debounceMs") and snake_case.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingSettings {
    #[serde(alias = "showHiddenFiles", default = "default_show_hidden")]
    pub show_hidden_files: bool,
    #[serde(alias = "listing.debounceMs", default)]
    pub debounce_ms: Option<u64>,
    #[serde(alias = "listing.rawCoalesceMs", default)]
    pub raw_coalesce_ms: Option<u64>,
    #[serde(alias = "listing.enrichmentItemCap", default)]
    pub enrichment_item_cap: Option<usize>,
    #[serde(alias = "listing.enrichmentWalkLimit", default)]
    pub enrichment_walk_limit: Option<usize>,
    #[serde(alias = "listing.sortBy", default)]
    pub sort_by: SortColumn,
    #[serde(alias = "listing.sortOrder", default)]
    pub sort_order: SortOrder,
    #[serde(alias = "listing.directorySortMode", default)]
    pub directory_sort_mode: DirectorySortMode,
}

fn default_show_hidden() -> bool {
    true
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            show_hidden_files: true,
            debounce_ms: None,
            raw_coalesce_ms: None,
            enrichment_item_cap: None,
            enrichment_walk_limit: None,
            sort_by: SortColumn::default(),
            sort_order: SortOrder::default(),
            directory_sort_mode: DirectorySortMode::default(),
        }
    }
}

impl ListingSettings {
    /// Loads settings from a JSON file.
    /// Returns defaults if the file doesn't exist or can't be parsed.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                log::warn!("Ignoring unparsable settings file {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }
}
