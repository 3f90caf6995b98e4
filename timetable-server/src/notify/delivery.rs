//! Delivery channels for notifications.

use std::future::Future;

use tracing::info;

use super::error::DeliveryError;
use super::payload::NotificationPayload;

/// Default webhook timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Hands a single notification to the outside world.
pub trait Delivery: Send + Sync {
    /// Deliver one notification. Called exactly once per change per dispatch.
    fn deliver(
        &self,
        payload: &NotificationPayload,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Delivery that writes notifications to the log.
#[derive(Debug, Clone, Default)]
pub struct LogDelivery;

impl Delivery for LogDelivery {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        info!(
            key = %payload.key,
            kind = payload.kind,
            title = %payload.title,
            body = %payload.body,
            "timetable change"
        );
        Ok(())
    }
}

/// Configuration for webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// URL that receives one JSON POST per notification
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Delivery that POSTs each payload as JSON.
#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    http: reqwest::Client,
    url: String,
}

impl WebhookDelivery {
    pub fn new(config: WebhookConfig) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.url,
        })
    }
}

impl Delivery for WebhookDelivery {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let response = self.http.post(&self.url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// The delivery channel chosen at startup.
#[derive(Debug, Clone)]
pub enum DeliveryChannel {
    Log(LogDelivery),
    Webhook(WebhookDelivery),
}

impl Delivery for DeliveryChannel {
    async fn deliver(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        match self {
            DeliveryChannel::Log(log) => log.deliver(payload).await,
            DeliveryChannel::Webhook(webhook) => webhook.deliver(payload).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{Change, ChangeKind, FieldDelta};
    use crate::domain::{ClassField, ClassKey, FieldValue};
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use chrono::Utc;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    type Received = Arc<Mutex<Vec<Value>>>;

    async fn accept(State(received): State<Received>, Json(body): Json<Value>) -> StatusCode {
        received.lock().unwrap().push(body);
        StatusCode::NO_CONTENT
    }

    async fn unavailable() -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }

    /// Serve a webhook receiver on an ephemeral port.
    async fn serve_receiver(received: Received) -> String {
        let app = Router::new()
            .route("/hook", post(accept))
            .route("/down", post(unavailable))
            .with_state(received);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn room_change() -> NotificationPayload {
        let change = Change {
            key: ClassKey::explicit("K1").unwrap(),
            subject: "Intro".into(),
            kind: ChangeKind::Modified {
                deltas: vec![FieldDelta {
                    field: ClassField::Room,
                    old: Some(FieldValue::Text("A1".into())),
                    new: Some(FieldValue::Text("A2".into())),
                }],
            },
        };
        NotificationPayload::from_change(&change, Utc::now())
    }

    fn webhook(url: String) -> WebhookDelivery {
        WebhookDelivery::new(WebhookConfig::new(url).with_timeout(5)).unwrap()
    }

    #[test]
    fn webhook_config_defaults() {
        let config = WebhookConfig::new("https://hooks.example.com/timetable");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.with_timeout(3).timeout_secs, 3);
    }

    #[tokio::test]
    async fn webhook_posts_payload_as_json() {
        let received = Received::default();
        let base = serve_receiver(Arc::clone(&received)).await;

        webhook(format!("{base}/hook"))
            .deliver(&room_change())
            .await
            .unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["key"], "K1");
        assert_eq!(received[0]["kind"], "modified");
        assert_eq!(received[0]["deltas"][0]["new"], "A2");
    }

    #[tokio::test]
    async fn webhook_error_status_is_rejected() {
        let base = serve_receiver(Received::default()).await;

        let result = webhook(format!("{base}/down")).deliver(&room_change()).await;

        assert!(matches!(
            result,
            Err(DeliveryError::Rejected { status: 503 })
        ));
    }
}
