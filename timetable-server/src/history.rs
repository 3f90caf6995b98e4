//! Recent change history.
//!
//! Keeps the last few change sets in memory for the `/api/changes`
//! endpoint. History is auxiliary: change detection only ever compares
//! against the stored snapshot, so losing history (restart, eviction, TTL)
//! loses nothing else.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache as MokaCache;
use serde::Serialize;

use crate::diff::ChangeSet;
use crate::notify::DispatchResult;

/// Configuration for the change history.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// How long an entry is kept.
    pub ttl: Duration,

    /// Maximum number of entries kept.
    pub max_capacity: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(7 * 24 * 60 * 60),
            max_capacity: 100,
        }
    }
}

/// One recorded change set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Increases with every entry recorded by this process
    pub id: u64,
    pub recorded_at: DateTime<Utc>,
    pub previous_timestamp: Option<DateTime<Utc>>,
    pub snapshot_timestamp: DateTime<Utc>,
    pub changes: ChangeSet,
    pub delivered: usize,
    pub failed: usize,
}

/// Bounded, time-limited log of recent change sets.
pub struct ChangeHistory {
    entries: MokaCache<u64, Arc<HistoryEntry>>,
    next_id: AtomicU64,
}

impl ChangeHistory {
    /// Create a new history with the given configuration.
    pub fn new(config: &HistoryConfig) -> Self {
        let entries = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            entries,
            next_id: AtomicU64::new(1),
        }
    }

    /// Record a change set and its delivery outcome. Returns the entry id.
    pub async fn record(
        &self,
        changes: &ChangeSet,
        previous_timestamp: Option<DateTime<Utc>>,
        snapshot_timestamp: DateTime<Utc>,
        dispatch: Option<&DispatchResult>,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = HistoryEntry {
            id,
            recorded_at: Utc::now(),
            previous_timestamp,
            snapshot_timestamp,
            changes: changes.clone(),
            delivered: dispatch.map_or(0, DispatchResult::delivered),
            failed: dispatch.map_or(0, DispatchResult::failed),
        };
        self.entries.insert(id, Arc::new(entry)).await;
        id
    }

    /// Most recent entries first.
    pub fn recent(&self, limit: usize) -> Vec<Arc<HistoryEntry>> {
        let mut entries: Vec<_> = self.entries.iter().map(|(_, entry)| entry).collect();
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        entries.truncate(limit);
        entries
    }

    /// Get history size (for monitoring). Eventually consistent.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}
