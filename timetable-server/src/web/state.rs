//! Application state for the web layer.

use std::sync::Arc;

use crate::feed::{StaticSession, TimetableFeed};
use crate::notify::DeliveryChannel;
use crate::refresh::RefreshOrchestrator;
use crate::store::FileSnapshotStore;

/// The refresh pipeline as wired in production.
pub type TimetableService =
    RefreshOrchestrator<TimetableFeed, StaticSession, FileSnapshotStore, DeliveryChannel>;

/// Shared application state.
///
/// Built once at startup and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Refresh pipeline and snapshot access
    pub service: Arc<TimetableService>,

    /// Reported by the status endpoint
    pub version: Arc<str>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(service: TimetableService, version: impl Into<Arc<str>>) -> Self {
        Self {
            service: Arc::new(service),
            version: version.into(),
        }
    }
}
