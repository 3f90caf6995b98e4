//! HTTP client for the remote timetable feed.

use reqwest::StatusCode;
use reqwest::header::{COOKIE, HeaderValue};
use serde::Deserialize;
use tracing::debug;

use crate::domain::RawClassItem;

use super::error::FetchError;
use super::session::SessionContext;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Longest response body kept in a parse error.
const MAX_ERROR_BODY: usize = 512;

/// Feed response body: either a bare list or a wrapper object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedBody {
    List(Vec<RawClassItem>),
    Wrapped {
        #[serde(alias = "data")]
        classes: Vec<RawClassItem>,
    },
}

impl FeedBody {
    fn into_classes(self) -> Vec<RawClassItem> {
        match self {
            FeedBody::List(classes) | FeedBody::Wrapped { classes } => classes,
        }
    }
}

/// Parse a feed response body into raw class records.
pub(crate) fn parse_feed_body(body: &str) -> Result<Vec<RawClassItem>, FetchError> {
    serde_json::from_str::<FeedBody>(body)
        .map(FeedBody::into_classes)
        .map_err(|e| FetchError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(MAX_ERROR_BODY).collect()),
        })
}

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    /// URL returning the timetable as JSON
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl FeedClientConfig {
    /// Create a new config for the given feed URL.
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

/// Client for the remote timetable feed.
///
/// Sends the session credential as a `Cookie` header.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    url: String,
}

impl FeedClient {
    /// Create a new feed client.
    pub fn new(config: FeedClientConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.url,
        })
    }

    /// Fetch all class records.
    pub async fn fetch_classes(
        &self,
        session: &SessionContext,
    ) -> Result<Vec<RawClassItem>, FetchError> {
        let mut request = self.http.get(&self.url);
        if !session.credential().is_empty() {
            let cookie = HeaderValue::from_str(session.credential()).map_err(|_| {
                FetchError::NotConfigured("session credential is not a valid header value".into())
            })?;
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let classes = parse_feed_body(&body)?;
        debug!(url = %self.url, records = classes.len(), "fetched timetable feed");
        Ok(classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{SessionProvider, StaticSession};
    use axum::Router;
    use axum::http::{HeaderMap, header};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;

    const SESSION: &str = "PHPSESSID=abc";

    /// Feed that wants the `SESSION` cookie: 401 without one, 403 for others.
    async fn classes(headers: HeaderMap) -> Response {
        match headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
            Some(SESSION) => r#"{"classes": [{"id": "K1", "course": "CS101"}]}"#.into_response(),
            Some(_) => axum::http::StatusCode::FORBIDDEN.into_response(),
            None => axum::http::StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    async fn broken() -> (axum::http::StatusCode, &'static str) {
        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "upstream down")
    }

    /// Serve the test feed on an ephemeral port and return its base URL.
    async fn serve_feed() -> String {
        let app = Router::new()
            .route("/classes", get(classes))
            .route("/broken", get(broken));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    async fn fetch(url: String, session: StaticSession) -> Result<Vec<RawClassItem>, FetchError> {
        let client = FeedClient::new(FeedClientConfig::new(url).with_timeout(5)).unwrap();
        let session = session.session().await.unwrap();
        client.fetch_classes(&session).await
    }

    #[test]
    fn config_defaults() {
        let config = FeedClientConfig::new("https://example.edu/timetable.json");
        assert_eq!(config.url, "https://example.edu/timetable.json");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn config_with_timeout() {
        let config = FeedClientConfig::new("http://localhost:8080").with_timeout(5);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn parse_bare_list() {
        let body = r#"[
            {"course": "CS101", "subject": "Intro", "day": "Mon", "start": "09:00", "end": "10:00"}
        ]"#;
        let classes = parse_feed_body(body).unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].course.as_deref(), Some("CS101"));
    }

    #[test]
    fn parse_wrapped_list() {
        let body = r#"{"data": [{"course": "CS101"}, {"course": "MA201"}]}"#;
        let classes = parse_feed_body(body).unwrap();
        assert_eq!(classes.len(), 2);
    }

    #[test]
    fn parse_html_is_json_error() {
        let err = parse_feed_body("<html>login</html>").unwrap_err();
        assert!(matches!(err, FetchError::Json { body: Some(_), .. }));
    }

    #[tokio::test]
    async fn sends_session_cookie() {
        let base = serve_feed().await;

        let classes = fetch(format!("{base}/classes"), StaticSession::new(SESSION))
            .await
            .unwrap();

        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].id.as_deref(), Some("K1"));
    }

    #[tokio::test]
    async fn missing_session_is_unauthorized() {
        let base = serve_feed().await;

        let result = fetch(format!("{base}/classes"), StaticSession::anonymous()).await;

        assert!(matches!(result, Err(FetchError::Unauthorized)));
    }

    #[tokio::test]
    async fn forbidden_is_unauthorized() {
        let base = serve_feed().await;

        let result = fetch(format!("{base}/classes"), StaticSession::new("PHPSESSID=old")).await;

        assert!(matches!(result, Err(FetchError::Unauthorized)));
    }

    #[tokio::test]
    async fn other_error_status_is_api_error() {
        let base = serve_feed().await;

        let result = fetch(format!("{base}/broken"), StaticSession::new(SESSION)).await;

        match result {
            Err(FetchError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "upstream down");
            }
            other => panic!("expected an API error, got {other:?}"),
        }
    }
}
