//! In-process snapshot store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::Snapshot;

use super::SnapshotStore;
use super::error::StorageError;

/// Snapshot store that keeps the record in memory.
///
/// Swapping an `Arc` under a write lock makes saves atomic for readers.
/// Nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    current: Arc<RwLock<Option<Arc<Snapshot>>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(Arc::new(snapshot)))),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<Arc<Snapshot>>, StorageError> {
        let guard = self.current.read().await;
        Ok(guard.clone())
    }

    async fn save(
        &self,
        snapshot: Arc<Snapshot>,
        expected: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        let mut guard = self.current.write().await;
        let found = guard.as_ref().map(|current| current.taken_at());
        if found != expected {
            return Err(StorageError::Conflict { expected, found });
        }
        *guard = Some(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn empty_store_loads_none() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_returns_same_snapshot() {
        let store = MemorySnapshotStore::new();
        let snapshot = Arc::new(Snapshot::new(Vec::new(), Utc::now(), None));

        store.save(snapshot.clone(), None).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&loaded, &snapshot));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = MemorySnapshotStore::new();
        let other = store.clone();

        store
            .save(Arc::new(Snapshot::new(Vec::new(), Utc::now(), None)), None)
            .await
            .unwrap();

        assert!(other.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn save_over_unexpected_snapshot_conflicts() {
        let first = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let store = MemorySnapshotStore::with_snapshot(Snapshot::new(Vec::new(), first, None));
        let next = Arc::new(Snapshot::new(Vec::new(), Utc::now(), None));

        let stale = store.save(Arc::clone(&next), None).await;
        assert!(matches!(
            stale,
            Err(StorageError::Conflict { expected: None, found: Some(t) }) if t == first
        ));

        store.save(next, Some(first)).await.unwrap();
        assert_ne!(store.load().await.unwrap().unwrap().taken_at(), first);
    }
}
