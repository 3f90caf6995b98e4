//! Fan-out of change sets to a delivery channel.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::diff::{Change, ChangeSet};
use crate::domain::ClassKey;

use super::delivery::Delivery;
use super::payload::NotificationPayload;

/// Default number of deliveries in flight at once.
const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Result of delivering one change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Failed { reason: String },
}

/// Outcome for one change in a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub key: ClassKey,
    pub kind: &'static str,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

/// Per-change outcomes of a dispatch, in change set order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DispatchResult {
    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == DeliveryStatus::Delivered)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }

    /// Failed outcomes with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (&ClassKey, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            DeliveryStatus::Failed { reason } => Some((&o.key, reason.as_str())),
            DeliveryStatus::Delivered => None,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }
}

/// Sends one notification per change.
///
/// Each change gets exactly one delivery attempt per call to
/// [`dispatch`](Self::dispatch). A failed delivery is recorded and the rest
/// continue.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher<D> {
    delivery: D,
    max_in_flight: usize,
}

impl<D: Delivery> NotificationDispatcher<D> {
    pub fn new(delivery: D) -> Self {
        Self {
            delivery,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Set maximum concurrent deliveries.
    pub fn with_max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n.max(1);
        self
    }

    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    pub async fn dispatch(&self, changes: &ChangeSet) -> DispatchResult {
        let detected_at = Utc::now();

        let outcomes: Vec<DeliveryOutcome> = stream::iter(changes.iter().cloned())
            .map(|change| self.deliver_one(change, detected_at))
            .buffered(self.max_in_flight)
            .collect()
            .await;

        let result = DispatchResult { outcomes };
        info!(
            delivered = result.delivered(),
            failed = result.failed(),
            "dispatched change notifications"
        );
        result
    }

    async fn deliver_one(&self, change: Change, detected_at: DateTime<Utc>) -> DeliveryOutcome {
        let payload = NotificationPayload::from_change(&change, detected_at);
        let status = match self.delivery.deliver(&payload).await {
            Ok(()) => DeliveryStatus::Delivered,
            Err(e) => {
                warn!(key = %change.key, error = %e, "notification delivery failed");
                DeliveryStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };
        DeliveryOutcome {
            kind: change.kind.label(),
            key: change.key,
            status,
        }
    }
}
