//! Refresh orchestration.
//!
//! Ties the pipeline together: take the refresh permit, fetch, validate,
//! commit through the cache coordinator, notify, record history. A failed
//! fetch or invalid data aborts before the snapshot store is touched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::cache::CacheCoordinator;
use crate::diff::ChangeSet;
use crate::domain::{DataIntegrityError, Snapshot};
use crate::feed::{FetchError, SessionProvider, TimetableSource};
use crate::history::ChangeHistory;
use crate::notify::{Delivery, DispatchResult, NotificationDispatcher};
use crate::store::{SnapshotStore, StorageError};

/// A refresh that did not complete.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// Another refresh holds the permit
    #[error("a refresh is already in progress")]
    InProgress,

    /// Feed unreachable or returned unusable data
    #[error("failed to fetch timetable: {0}")]
    Fetch(#[from] FetchError),

    /// Feed data failed validation or contained duplicate classes
    #[error("timetable data rejected: {0}")]
    Integrity(#[from] DataIntegrityError),

    /// Another writer sharing the snapshot store committed first
    #[error("the stored timetable changed during refresh; retry")]
    Superseded,

    /// Snapshot could not be loaded or saved
    #[error("snapshot storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// A completed refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// The snapshot now stored
    pub snapshot: Arc<Snapshot>,

    pub changes: ChangeSet,

    /// Capture time of the snapshot that was replaced
    pub previous_timestamp: Option<DateTime<Utc>>,

    /// Notification outcomes; `None` when there was nothing to notify
    pub dispatch: Option<DispatchResult>,
}

impl RefreshOutcome {
    /// Human-readable notes on partial failures.
    pub fn warnings(&self) -> Vec<String> {
        self.dispatch
            .iter()
            .flat_map(|dispatch| dispatch.failures())
            .map(|(key, reason)| format!("notification for {key} failed: {reason}"))
            .collect()
    }
}

/// Runs refreshes and serves cached data.
pub struct RefreshOrchestrator<F, P, S, D> {
    source: F,
    sessions: P,
    cache: CacheCoordinator<S>,
    dispatcher: NotificationDispatcher<D>,
    history: ChangeHistory,
}

impl<F, P, S, D> RefreshOrchestrator<F, P, S, D>
where
    F: TimetableSource,
    P: SessionProvider,
    S: SnapshotStore,
    D: Delivery,
{
    pub fn new(
        source: F,
        sessions: P,
        store: S,
        dispatcher: NotificationDispatcher<D>,
        history: ChangeHistory,
    ) -> Self {
        Self {
            source,
            sessions,
            cache: CacheCoordinator::new(store),
            dispatcher,
            history,
        }
    }

    /// The currently committed snapshot, or `None` before the first refresh.
    pub async fn get_cached(&self) -> Result<Option<Arc<Snapshot>>, StorageError> {
        self.cache.load_cached().await
    }

    /// Fetch fresh data, commit it and notify about changes.
    pub async fn refresh_now(&self) -> Result<RefreshOutcome, RefreshError> {
        let permit = self.cache.try_begin().inspect_err(|_| {
            info!("refresh already in progress, rejecting request");
        })?;

        let session = self.sessions.session().await?;
        let records = self
            .source
            .fetch_classes(&session)
            .await
            .inspect_err(|e| warn!(error = %e, "timetable fetch failed"))?;
        info!(records = records.len(), "fetched timetable");

        let snapshot = Snapshot::from_raw(records, Utc::now(), Some(session.auth_ref().clone()))
            .inspect_err(|e| warn!(error = %e, "timetable data rejected"))?;

        let committed = permit.commit(snapshot).await?;

        let dispatch = if committed.changes.has_changes() {
            Some(self.dispatcher.dispatch(&committed.changes).await)
        } else {
            None
        };

        if committed.changes.has_changes() {
            self.history
                .record(
                    &committed.changes,
                    committed.previous_timestamp,
                    committed.snapshot.taken_at(),
                    dispatch.as_ref(),
                )
                .await;
        }

        Ok(RefreshOutcome {
            snapshot: committed.snapshot,
            changes: committed.changes,
            previous_timestamp: committed.previous_timestamp,
            dispatch,
        })
    }

    pub fn history(&self) -> &ChangeHistory {
        &self.history
    }
}
