//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::history::HistoryEntry;
use crate::refresh::RefreshError;
use crate::store::StorageError;

use super::dto::*;
use super::state::AppState;

/// Default and maximum number of history entries per request.
const DEFAULT_CHANGES_LIMIT: usize = 10;
const MAX_CHANGES_LIMIT: usize = 100;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/timetable", get(timetable))
        .route("/api/refresh", get(refresh).post(refresh))
        .route("/api/changes", get(changes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        success: true,
        status: "running",
        version: state.version.to_string(),
        timestamp: Utc::now(),
    })
}

/// Serve the stored snapshot without contacting the feed.
async fn timetable(State(state): State<AppState>) -> Result<Json<TimetableResponse>, AppError> {
    let snapshot = state
        .service
        .get_cached()
        .await?
        .ok_or_else(|| AppError::NotFound {
            message: "No timetable data. Please refresh first.".into(),
        })?;

    Ok(Json(TimetableResponse::from_snapshot(&snapshot)))
}

/// Fetch fresh data, store it and notify about changes.
async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, AppError> {
    let outcome = state.service.refresh_now().await?;
    Ok(Json(RefreshResponse::from_outcome(&outcome)))
}

async fn changes(
    State(state): State<AppState>,
    Query(query): Query<ChangesQuery>,
) -> Json<ChangesResponse> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_CHANGES_LIMIT)
        .min(MAX_CHANGES_LIMIT);

    Json(ChangesResponse {
        success: true,
        entries: state
            .service
            .history()
            .recent(limit)
            .into_iter()
            .map(|entry| HistoryEntry::clone(&entry))
            .collect(),
    })
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound { message: String },
    Conflict { message: String },
    BadGateway { message: String },
    Internal { message: String },
}

impl From<RefreshError> for AppError {
    fn from(e: RefreshError) -> Self {
        let message = e.to_string();
        match e {
            RefreshError::InProgress | RefreshError::Superseded => {
                AppError::Conflict { message }
            }
            RefreshError::Fetch(_) => AppError::BadGateway { message },
            RefreshError::Integrity(_) | RefreshError::Storage(_) => AppError::Internal { message },
        }
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Internal {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Conflict { message } => (StatusCode::CONFLICT, message),
            AppError::BadGateway { message } => (StatusCode::BAD_GATEWAY, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = Json(ErrorResponse {
            success: false,
            error: message,
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FileFeed, StaticSession, TimetableFeed};
    use crate::history::{ChangeHistory, HistoryConfig};
    use crate::notify::{DeliveryChannel, LogDelivery, NotificationDispatcher};
    use crate::refresh::RefreshOrchestrator;
    use crate::store::FileSnapshotStore;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::Value;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};
    use tower::ServiceExt;

    const FIRST: &str = r#"[
        {"id": "K1", "course": "CS101", "name": "Intro", "room": "A1",
         "day": "Mon", "start": "09:00", "end": "10:00"},
        {"id": "K2", "course": "MA201", "name": "Calculus", "room": "B1",
         "day": "Tue", "start": "11:00", "end": "12:30"}
    ]"#;

    const SECOND: &str = r#"{"classes": [
        {"id": "K2", "course": "MA201", "name": "Calculus", "room": "B2",
         "day": "Tue", "start": "11:00", "end": "12:30"},
        {"id": "K3", "course": "PH110", "name": "Physics", "room": "C1",
         "day": "Wed", "start": "14:00", "end": "15:00"}
    ]}"#;

    struct Harness {
        dir: TempDir,
        app: Router,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let service = RefreshOrchestrator::new(
                TimetableFeed::File(FileFeed::new(dir.path().join("feed.json"))),
                StaticSession::anonymous(),
                FileSnapshotStore::new(dir.path().join("data/snapshot.json")),
                NotificationDispatcher::new(DeliveryChannel::Log(LogDelivery)),
                ChangeHistory::new(&HistoryConfig::default()),
            );
            let app = create_router(AppState::new(service, "1.2.3"));
            Self { dir, app }
        }

        fn feed(&self, body: &str) {
            std::fs::write(self.feed_path(), body).unwrap();
        }

        fn feed_path(&self) -> std::path::PathBuf {
            self.dir.path().join("feed.json")
        }

        fn snapshot_path(&self) -> std::path::PathBuf {
            self.dir.path().join("data/snapshot.json")
        }

        async fn request(&self, method: Method, uri: &str) -> (StatusCode, Value) {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, json)
        }
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let harness = Harness::new();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = harness.app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn status_reports_version() {
        let harness = Harness::new();

        let (status, json) = harness.request(Method::GET, "/api/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["status"], "running");
        assert_eq!(json["version"], "1.2.3");
    }

    #[tokio::test]
    async fn timetable_before_refresh_is_not_found() {
        let harness = Harness::new();

        let (status, json) = harness.request(Method::GET, "/api/timetable").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No timetable data. Please refresh first.");
    }

    #[tokio::test]
    async fn first_refresh_then_cached_read() {
        let harness = Harness::new();
        harness.feed(FIRST);

        let (status, json) = harness.request(Method::POST, "/api/refresh").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["cached"], false);
        assert_eq!(json["classCount"], 2);
        assert_eq!(json["initial"], true);
        assert!(json["changes"].is_null());
        assert_eq!(json["notifications"]["delivered"], 0);
        assert!(json["previousTimestamp"].is_null());
        assert!(read(&harness.snapshot_path()).contains("\"K1\""));

        let (status, cached) = harness.request(Method::GET, "/api/timetable").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cached["cached"], true);
        assert_eq!(cached["timestamp"], json["timestamp"]);
        assert_eq!(cached["data"][1]["durationMins"], 90);
    }

    #[tokio::test]
    async fn second_refresh_reports_changes() {
        let harness = Harness::new();
        harness.feed(FIRST);
        harness.request(Method::GET, "/api/refresh").await;

        harness.feed(SECOND);
        let (status, json) = harness.request(Method::GET, "/api/refresh").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["initial"], false);
        assert_eq!(json["summary"]["added"], 1);
        assert_eq!(json["summary"]["removed"], 1);
        assert_eq!(json["summary"]["modified"], 1);
        let kinds: Vec<_> = json["changes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| (c["key"].as_str().unwrap(), c["kind"].as_str().unwrap()))
            .collect();
        assert_eq!(
            kinds,
            vec![("K1", "removed"), ("K2", "modified"), ("K3", "added")]
        );
        assert_eq!(json["notifications"]["delivered"], 3);
        assert_eq!(json["warnings"].as_array().unwrap().len(), 0);

        let (status, history) = harness.request(Method::GET, "/api/changes?limit=5").await;
        assert_eq!(status, StatusCode::OK);
        let entries = history["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["delivered"], 3);
    }

    #[tokio::test]
    async fn feed_failure_is_bad_gateway_and_keeps_snapshot() {
        let harness = Harness::new();
        harness.feed(FIRST);
        harness.request(Method::POST, "/api/refresh").await;
        let stored = read(&harness.snapshot_path());

        std::fs::remove_file(harness.feed_path()).unwrap();
        let (status, json) = harness.request(Method::POST, "/api/refresh").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["success"], false);
        assert_eq!(read(&harness.snapshot_path()), stored);
    }

    #[tokio::test]
    async fn invalid_record_is_internal_error() {
        let harness = Harness::new();
        harness.feed(
            r#"[{"id": "K1", "course": "CS101", "name": "Intro",
                 "day": "Mon", "start": "10:00", "end": "09:00"}]"#,
        );

        let (status, json) = harness.request(Method::POST, "/api/refresh").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
        assert!(!harness.snapshot_path().exists());
    }

    #[test]
    fn refresh_errors_map_to_status() {
        let status = |e: RefreshError| AppError::from(e).into_response().status();

        assert_eq!(status(RefreshError::InProgress), StatusCode::CONFLICT);
        assert_eq!(status(RefreshError::Superseded), StatusCode::CONFLICT);
        assert_eq!(
            status(RefreshError::Fetch(crate::feed::FetchError::Unauthorized)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(RefreshError::Integrity(
                crate::domain::DataIntegrityError::MissingField("day")
            )),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
