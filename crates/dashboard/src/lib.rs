//! Hazard Eye Dashboard
//!
//! Runs the stream client and exposes its session over a local HTTP API
//! so a presentation layer can read state and feed in position fixes and
//! user actions.

use axum::{
    routing::{get, post},
    Router,
    Json,
    extract::State,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod report;
mod routes;

use backend_api::BackendClient;
use stream_client::{ClientEvent, SessionReader};
use tokio::sync::mpsc;

/// Application state shared across handlers
pub struct AppState {
    /// Read side of the stream session
    pub session: SessionReader,
    /// Event queue into the client loop
    pub events: mpsc::Sender<ClientEvent>,
    /// Detection backend control API
    pub backend: BackendClient,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        session: SessionReader,
        events: mpsc::Sender<ClientEvent>,
        backend: BackendClient,
    ) -> Self {
        Self {
            session,
            events,
            backend,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub stream_connected: bool,
    pub mode: String,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/session", get(routes::session::get_session))
        .route("/api/v1/location", post(routes::session::post_location))
        .route("/api/v1/mode", post(routes::video::set_mode))
        .route("/api/v1/video/upload", post(routes::video::upload))
        .route("/api/v1/video/stop", post(routes::video::stop))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let session = state.session.snapshot();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let status = if session.connected { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        stream_connected: session.connected,
        mode: session.mode_label().to_string(),
    })
}

/// Initialize logging; `RUST_LOG` overrides the `info` default
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();
}

/// Install the Prometheus exporter when a listen address is configured
pub fn init_metrics(listen: Option<SocketAddr>) -> anyhow::Result<()> {
    let Some(addr) = listen else {
        return Ok(());
    };
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    info!("Prometheus metrics on http://{}/metrics", addr);
    Ok(())
}

/// Serve the status API until `shutdown` resolves
pub async fn run_server(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!("Starting status API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
