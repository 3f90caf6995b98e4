//! Change notifications.
//!
//! The dispatcher turns each change into a payload and hands it to a
//! delivery channel. Transport details live in the channel; the dispatcher
//! only guarantees one attempt per change and isolates failures.

mod delivery;
mod dispatch;
mod error;
mod payload;

pub use delivery::{Delivery, DeliveryChannel, LogDelivery, WebhookConfig, WebhookDelivery};
pub use dispatch::{DeliveryOutcome, DeliveryStatus, DispatchResult, NotificationDispatcher};
pub use error::DeliveryError;
pub use payload::NotificationPayload;
