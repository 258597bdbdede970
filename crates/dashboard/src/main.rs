//! Hazard Eye - Main Entry Point

use std::path::PathBuf;
use std::sync::Arc;

use alerting::{LogAlertSink, ReportThrottle};
use anyhow::Context;
use backend_api::{BackendClient, LogReportNotifier};
use dashboard::config::Settings;
use dashboard::report::run_report_notifier;
use dashboard::{init_logging, init_metrics, run_server, AppState};
use frame_renderer::CanvasSurface;
use stream_client::{ClientEvent, StreamClient};
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref()).context("loading configuration")?;

    info!("=== Hazard Eye v{} ===", env!("CARGO_PKG_VERSION"));
    init_metrics(settings.metrics.listen)?;

    let backend = BackendClient::new(settings.api.clone())?;
    let client = StreamClient::new(
        settings.stream.clone(),
        settings.alert.clone(),
        CanvasSurface::new(),
        LogAlertSink::new(),
    )?;
    info!("Stream endpoint: {}", client.url());
    let handle = client.spawn();

    match backend.get_mode().await {
        Ok(mode) => {
            if handle.send(ClientEvent::ModeChanged(mode)).await.is_err() {
                warn!("Stream client stopped before startup finished");
            }
        }
        Err(e) => warn!("Could not fetch detection mode: {}", e),
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let notifier = tokio::spawn(run_report_notifier(
        handle.session(),
        backend.clone(),
        ReportThrottle::new(settings.report.clone()),
        Arc::new(LogReportNotifier),
        stop_rx,
    ));

    let state = Arc::new(AppState::new(handle.session(), handle.events(), backend));
    run_server(&settings.server.bind, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
    })
    .await?;

    let _ = stop_tx.send(true);
    if let Err(e) = notifier.await {
        warn!("Report notifier task failed: {}", e);
    }
    handle.shutdown().await?;

    info!("Hazard Eye stopped");
    Ok(())
}
