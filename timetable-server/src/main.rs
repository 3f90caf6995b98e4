use timetable_server::config::AppConfig;
use timetable_server::history::ChangeHistory;
use timetable_server::notify::NotificationDispatcher;
use timetable_server::refresh::RefreshOrchestrator;
use timetable_server::store::FileSnapshotStore;
use timetable_server::web::{AppState, create_router};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; the environment may already be set
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    let feed = config
        .timetable_feed()
        .expect("Failed to create timetable feed");
    let delivery = config
        .delivery_channel()
        .expect("Failed to create notification channel");
    if config.webhook_url.is_none() {
        warn!("WEBHOOK_URL not set, notifications will only be logged");
    }

    let dispatcher =
        NotificationDispatcher::new(delivery).with_max_in_flight(config.max_in_flight_deliveries);
    let service = RefreshOrchestrator::new(
        feed,
        config.session(),
        FileSnapshotStore::new(&config.snapshot_path),
        dispatcher,
        ChangeHistory::new(&config.history),
    );

    match service.get_cached().await {
        Ok(Some(snapshot)) => info!(
            classes = snapshot.len(),
            taken_at = %snapshot.taken_at(),
            "loaded stored timetable"
        ),
        Ok(None) => info!("no stored timetable yet, first refresh will populate it"),
        Err(e) => warn!(error = %e, "stored timetable is unreadable"),
    }

    let state = AppState::new(service, config.version.clone());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listener");
    info!(addr = %config.bind_addr, version = %config.version, "timetable server listening");
    info!("  GET      /health         - Health check");
    info!("  GET      /api/status     - Service status");
    info!("  GET      /api/timetable  - Stored timetable");
    info!("  GET/POST /api/refresh    - Fetch, diff and notify");
    info!("  GET      /api/changes    - Recent changes");

    axum::serve(listener, app).await.expect("Server error");
}
