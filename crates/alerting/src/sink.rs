//! Warning outputs

use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Payload handed to sinks when a warning is raised
#[derive(Debug, Clone, PartialEq)]
pub struct HazardWarning {
    pub message: String,
    pub lane_hazard_count: u32,
    pub hazard_type: Option<String>,
    /// Closest reported hazard (meters)
    pub nearest_m: Option<f64>,
}

/// Audible/visual output driven by the warning state machine
pub trait AlertSink: Send {
    fn warning_raised(&mut self, warning: &HazardWarning);

    /// Dismiss the warning; audio stops and rewinds to the start
    fn warning_cleared(&mut self);
}

/// Looping alert tone playback cursor
#[derive(Debug, Clone, Default)]
pub struct AlertTone {
    started_at: Option<Instant>,
}

impl AlertTone {
    pub fn play(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Stop and rewind to the start
    pub fn stop(&mut self) {
        self.started_at = None;
    }

    pub fn is_playing(&self) -> bool {
        self.started_at.is_some()
    }

    /// Playback position since the last rewind
    pub fn position(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }
}

/// Sink that reports warnings through the log
#[derive(Debug, Default)]
pub struct LogAlertSink {
    tone: AlertTone,
}

impl LogAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tone(&self) -> &AlertTone {
        &self.tone
    }
}

impl AlertSink for LogAlertSink {
    fn warning_raised(&mut self, warning: &HazardWarning) {
        self.tone.play();
        match warning.nearest_m {
            Some(d) => warn!(
                "⚠️ {} ({} in lane, nearest {:.1}m)",
                warning.message, warning.lane_hazard_count, d
            ),
            None => warn!("⚠️ {} ({} in lane)", warning.message, warning.lane_hazard_count),
        }
    }

    fn warning_cleared(&mut self) {
        let played = self.tone.position();
        self.tone.stop();
        info!("Lane clear, warning dismissed (tone played {:.1}s)", played.as_secs_f64());
    }
}
