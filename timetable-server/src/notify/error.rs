//! Notification delivery error types.

/// A single notification could not be delivered.
///
/// Delivery errors are per change and never abort a refresh.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Receiver answered with a non-success status
    #[error("receiver rejected notification with status {status}")]
    Rejected { status: u16 },

    /// Channel-specific failure
    #[error("{0}")]
    Channel(String),
}
