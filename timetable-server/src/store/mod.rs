//! Durable storage for the latest timetable snapshot.
//!
//! A store holds exactly one logical record. Saves are atomic with respect
//! to loads: a reader sees either the previous record or the new one.

mod error;
mod file;
mod memory;

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::Snapshot;

pub use error::StorageError;
pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

/// Persistence for the most recent snapshot.
///
/// This abstraction allows the cache coordinator to be tested without disk.
pub trait SnapshotStore: Send + Sync {
    /// Load the most recently saved snapshot.
    ///
    /// Returns `Ok(None)` when nothing has been saved yet.
    fn load(
        &self,
    ) -> impl Future<Output = Result<Option<Arc<Snapshot>>, StorageError>> + Send;

    /// Replace the stored snapshot, provided the stored record's capture
    /// time is still `expected` (`None` meaning nothing stored).
    ///
    /// Fails with [`StorageError::Conflict`] when another writer got there
    /// first. On any error the previously stored snapshot is left intact.
    fn save(
        &self,
        snapshot: Arc<Snapshot>,
        expected: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}
