//! Precomputed result sets (search results).

use std::collections::HashMap;
use std::sync::RwLock;

use super::Enumeration;
use crate::error::ListingError;
use crate::ignore_poison::IgnorePoisonRw;
use crate::listing::model::Item;

/// Items produced elsewhere, plus the virtual path that identifies them.
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub virtual_path: String,
    pub items: Vec<Item>,
}

/// Supplies precomputed result sets by key.
pub trait ResultSetProvider: Send + Sync {
    fn result_set(&self, key: &str) -> Option<ResultSet>;
}

/// In-memory result-set provider.
#[derive(Debug, Default)]
pub struct StaticResultSets {
    sets: RwLock<HashMap<String, ResultSet>>,
}

impl StaticResultSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, set: ResultSet) {
        self.sets.write_ignore_poison().insert(key.into(), set);
    }
}

impl ResultSetProvider for StaticResultSets {
    fn result_set(&self, key: &str) -> Option<ResultSet> {
        self.sets.read_ignore_poison().get(key).cloned()
    }
}

/// Passes the stored items through unchanged. Nothing to watch.
pub(super) fn enumerate(provider: &dyn ResultSetProvider, key: &str) -> Result<Enumeration, ListingError> {
    let set = provider
        .result_set(key)
        .ok_or_else(|| ListingError::unavailable(format!("results:{}", key), "Result set no longer available"))?;

    Ok(Enumeration {
        items: set.items,
        watch_paths: Vec::new(),
        failures: Vec::new(),
        virtual_location: Some(set.virtual_path),
    })
}
