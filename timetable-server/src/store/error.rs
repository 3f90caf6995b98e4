//! Snapshot store error types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Errors that can occur when persisting or loading snapshots.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot could not be encoded
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Stored record exists but cannot be decoded
    #[error("stored snapshot at {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Another writer replaced the record since the caller loaded it
    #[error("stored snapshot changed concurrently (expected {expected:?}, found {found:?})")]
    Conflict {
        expected: Option<DateTime<Utc>>,
        found: Option<DateTime<Utc>>,
    },
}
