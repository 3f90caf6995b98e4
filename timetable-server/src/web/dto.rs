//! Data transfer objects for web requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::{Change, ChangeSummary};
use crate::domain::{ClassItem, Snapshot};
use crate::history::HistoryEntry;
use crate::notify::{DeliveryOutcome, DispatchResult};
use crate::refresh::RefreshOutcome;

/// A class as shown to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassView {
    pub key: String,
    pub course: String,
    pub section: Option<String>,
    pub subject: String,
    pub instructor: Option<String>,
    pub room: Option<String>,

    /// Three-letter day name (e.g., "Mon")
    pub day: String,

    /// Start time in HH:MM format
    pub start: String,

    /// End time in HH:MM format
    pub end: String,

    pub duration_mins: i64,
    pub status: Option<String>,
    pub cancelled: bool,
}

/// Response for the cached timetable.
#[derive(Debug, Serialize)]
pub struct TimetableResponse {
    pub success: bool,
    pub data: Vec<ClassView>,

    /// Always true: served from the stored snapshot
    pub cached: bool,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
}

/// Delivery summary for a refresh.
#[derive(Debug, Default, Serialize)]
pub struct NotificationSummary {
    pub delivered: usize,
    pub failed: usize,
    pub outcomes: Vec<DeliveryOutcome>,
}

/// Response for a completed refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub data: Vec<ClassView>,

    /// Always false: freshly fetched
    pub cached: bool,

    pub timestamp: DateTime<Utc>,
    pub previous_timestamp: Option<DateTime<Utc>>,
    pub class_count: usize,

    /// True on the first refresh, when nothing is reported as changed
    pub initial: bool,

    pub summary: ChangeSummary,

    /// `null` when nothing changed, including the first refresh
    pub changes: Option<Vec<Change>>,
    pub notifications: NotificationSummary,

    /// Non-fatal problems, such as failed notifications
    pub warnings: Vec<String>,
}

/// Service status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: &'static str,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Query for recent change history.
#[derive(Debug, Deserialize)]
pub struct ChangesQuery {
    /// Maximum entries to return (default 10, capped at 100)
    pub limit: Option<usize>,
}

/// Recent change history, newest first.
#[derive(Debug, Serialize)]
pub struct ChangesResponse {
    pub success: bool,
    pub entries: Vec<HistoryEntry>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,

    /// Error message
    pub error: String,
}

// Conversion implementations

impl ClassView {
    /// Create from a domain ClassItem.
    pub fn from_item(item: &ClassItem) -> Self {
        Self {
            key: item.key.to_string(),
            course: item.course.clone(),
            section: item.section.clone(),
            subject: item.subject.clone(),
            instructor: item.instructor.clone(),
            room: item.room.clone(),
            day: item.day.to_string(),
            start: item.start.format("%H:%M").to_string(),
            end: item.end.format("%H:%M").to_string(),
            duration_mins: item.duration_mins(),
            status: item.status.clone(),
            cancelled: item.is_cancelled(),
        }
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Vec<Self> {
        snapshot.classes().iter().map(Self::from_item).collect()
    }
}

impl TimetableResponse {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            success: true,
            data: ClassView::from_snapshot(snapshot),
            cached: true,
            timestamp: snapshot.taken_at(),
        }
    }
}

impl NotificationSummary {
    fn from_dispatch(dispatch: &DispatchResult) -> Self {
        Self {
            delivered: dispatch.delivered(),
            failed: dispatch.failed(),
            outcomes: dispatch.outcomes.clone(),
        }
    }
}

impl RefreshResponse {
    pub fn from_outcome(outcome: &RefreshOutcome) -> Self {
        Self {
            success: true,
            data: ClassView::from_snapshot(&outcome.snapshot),
            cached: false,
            timestamp: outcome.snapshot.taken_at(),
            previous_timestamp: outcome.previous_timestamp,
            class_count: outcome.snapshot.len(),
            initial: outcome.changes.is_initial(),
            summary: outcome.changes.summary(),
            changes: outcome
                .changes
                .has_changes()
                .then(|| outcome.changes.changes().to_vec()),
            notifications: outcome
                .dispatch
                .as_ref()
                .map(NotificationSummary::from_dispatch)
                .unwrap_or_default(),
            warnings: outcome.warnings(),
        }
    }
}
