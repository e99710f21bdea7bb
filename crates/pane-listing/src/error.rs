//! Error types for listing, loading and watching.

use serde::{Deserialize, Serialize};

/// Error produced by a load cycle.
///
/// Only `SourceUnavailable` ever reaches subscribers. `Cancelled` marks a superseded
/// generation and is dropped silently by the loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ListingError {
    /// The path, library or tag can no longer be resolved.
    SourceUnavailable { location: String, reason: String },
    /// The generation was superseded before it finished.
    Cancelled,
    /// A background task panicked or was aborted.
    Internal { message: String },
}

impl ListingError {
    pub fn unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl std::fmt::Display for ListingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceUnavailable { location, reason } => write!(f, "Source unavailable: {}: {}", location, reason),
            Self::Cancelled => write!(f, "Listing cancelled"),
            Self::Internal { message } => write!(f, "Listing task failed: {}", message),
        }
    }
}

impl std::error::Error for ListingError {}

impl From<std::io::Error> for ListingError {
    fn from(err: std::io::Error) -> Self {
        Self::SourceUnavailable {
            location: String::new(),
            reason: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for ListingError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Internal {
                message: err.to_string(),
            }
        }
    }
}

/// One constituent of a multi-path source that failed to enumerate.
///
/// Recorded on the snapshot; the remaining constituents still publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialFailure {
    pub path: String,
    pub message: String,
}

/// Errors that can occur when attaching a change watcher.
#[derive(Debug)]
pub enum WatchError {
    Notify(notify::Error),
}

impl std::fmt::Display for WatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchError::Notify(e) => write!(f, "Failed to watch path: {e}"),
        }
    }
}

impl std::error::Error for WatchError {}

impl From<notify::Error> for WatchError {
    fn from(err: notify::Error) -> Self {
        WatchError::Notify(err)
    }
}
