//! Hazard report notifier task
//!
//! Watches the session and submits a report whenever a hazard type is
//! present while connected with a known position, subject to the
//! per-type cooldown and hourly cap.

use std::sync::Arc;

use alerting::ReportThrottle;
use backend_api::{BackendClient, ReportNotifier};
use hazard_protocol::Location;
use stream_client::{SessionReader, SessionState};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Hazard type and position a report would carry, if one is due
pub fn report_candidate(state: &SessionState) -> Option<(&str, Location)> {
    if !state.connected {
        return None;
    }
    let hazard_type = state.hazard_type.as_deref().filter(|t| !t.is_empty())?;
    Some((hazard_type, state.location?))
}

/// Send one report. Only an accepted report counts against the throttle.
pub async fn submit_report(
    backend: &BackendClient,
    throttle: &mut ReportThrottle,
    notifier: &dyn ReportNotifier,
    hazard_type: &str,
    location: Location,
) -> bool {
    debug!("Reporting {} at {:?}", hazard_type, location);
    match backend.report_hazard(hazard_type, location).await {
        Ok(receipt) => {
            throttle.record(hazard_type, Instant::now());
            metrics::counter!("hazard_eye_reports_total").increment(1);
            notifier.report_sent(hazard_type, &receipt);
            true
        }
        Err(e) => {
            warn!("Hazard report failed: {}", e);
            false
        }
    }
}

/// Run until `shutdown` flips or the session ends
pub async fn run_report_notifier(
    mut session: SessionReader,
    backend: BackendClient,
    mut throttle: ReportThrottle,
    notifier: Arc<dyn ReportNotifier>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Starting hazard report notifier");

    loop {
        let state = tokio::select! {
            changed = session.changed() => match changed {
                Ok(state) => state,
                Err(_) => break,
            },
            _ = shutdown.changed() => break,
        };

        let Some((hazard_type, location)) = report_candidate(&state) else {
            continue;
        };
        if !throttle.should_report(hazard_type, Instant::now()) {
            continue;
        }
        submit_report(&backend, &mut throttle, notifier.as_ref(), hazard_type, location).await;
    }

    info!("Hazard report notifier stopped");
}
