//! Cache coordination for timetable snapshots.
//!
//! The coordinator owns the snapshot store. Reads go straight to the store;
//! a refresh runs load, diff and save inside a single-writer critical
//! section so no diff is computed against a stale snapshot and no newer
//! snapshot is overwritten by an older one.
//!
//! Contention is rejected rather than queued: a refresh requested while
//! another holds the permit fails with [`RefreshError::InProgress`]. Callers
//! take the permit before fetching, so a rejected request never fetches.
//!
//! The permit only covers this process. Writers elsewhere sharing the store
//! are caught at save time: the store refuses to replace a record other than
//! the one the diff was computed against, and the refresh fails with
//! [`RefreshError::Superseded`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::diff::{ChangeSet, diff};
use crate::domain::Snapshot;
use crate::refresh::RefreshError;
use crate::store::{SnapshotStore, StorageError};

/// Result of committing a new snapshot.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    /// The snapshot now stored
    pub snapshot: Arc<Snapshot>,

    /// Differences from the snapshot it replaced
    pub changes: ChangeSet,

    /// Capture time of the replaced snapshot, if there was one
    pub previous_timestamp: Option<DateTime<Utc>>,
}

/// Serializes refreshes over a snapshot store.
pub struct CacheCoordinator<S> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: SnapshotStore> CacheCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Load the committed snapshot without taking the write lock.
    ///
    /// May run concurrently with a refresh and sees whichever snapshot is
    /// committed at the time.
    pub async fn load_cached(&self) -> Result<Option<Arc<Snapshot>>, StorageError> {
        self.store.load().await
    }

    /// Take the refresh permit, or fail if a refresh is in flight.
    pub fn try_begin(&self) -> Result<RefreshPermit<'_, S>, RefreshError> {
        let guard = self
            .write_lock
            .try_lock()
            .map_err(|_| RefreshError::InProgress)?;
        Ok(RefreshPermit {
            coordinator: self,
            _guard: guard,
        })
    }

    /// Commit `current` as the new snapshot and report what changed.
    pub async fn refresh(&self, current: Snapshot) -> Result<CommitOutcome, RefreshError> {
        self.try_begin()?.commit(current).await
    }
}

/// Exclusive right to run one load-diff-save sequence.
///
/// Dropping the permit without committing releases the lock and leaves the
/// store untouched.
pub struct RefreshPermit<'a, S> {
    coordinator: &'a CacheCoordinator<S>,
    _guard: MutexGuard<'a, ()>,
}

impl<S: SnapshotStore> RefreshPermit<'_, S> {
    /// Diff `current` against the stored snapshot, then store it.
    ///
    /// Integrity failures abort before the save. A failed save leaves the
    /// previous snapshot in place, as does losing a race with another writer.
    pub async fn commit(self, current: Snapshot) -> Result<CommitOutcome, RefreshError> {
        let store = &self.coordinator.store;

        let previous = store.load().await?;
        let changes = diff(previous.as_deref(), &current)?;

        let snapshot = Arc::new(current);
        let previous_timestamp = previous.as_ref().map(|p| p.taken_at());
        store
            .save(Arc::clone(&snapshot), previous_timestamp)
            .await
            .map_err(|e| match e {
                StorageError::Conflict { .. } => {
                    warn!(error = %e, "snapshot replaced by another writer");
                    RefreshError::Superseded
                }
                e => RefreshError::Storage(e),
            })?;

        let summary = changes.summary();
        info!(
            classes = snapshot.len(),
            added = summary.added,
            removed = summary.removed,
            modified = summary.modified,
            initial = changes.is_initial(),
            "committed snapshot"
        );

        Ok(CommitOutcome {
            snapshot,
            changes,
            previous_timestamp,
        })
    }
}
