//! Hazard report throttling
//!
//! One continuous detection shows up as many telemetry messages carrying
//! the same hazard type. Reports are gated per type by a cooldown and
//! globally by an hourly cap.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Throttle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Cooldown between reports of the same hazard type (seconds)
    pub cooldown_seconds: u64,
    /// Maximum reports per hour across all types
    pub max_reports_per_hour: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 30,
            max_reports_per_hour: 60,
        }
    }
}

/// Per-type cooldown and hourly cap
pub struct ReportThrottle {
    config: ThrottleConfig,
    /// Last report time by hazard type
    last_sent: HashMap<String, Instant>,
    /// Reports sent in current hour
    hourly_count: usize,
    /// Hour start time
    hour_start: Instant,
}

impl ReportThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        info!("Creating report throttle with config: {:?}", config);
        Self {
            config,
            last_sent: HashMap::new(),
            hourly_count: 0,
            hour_start: Instant::now(),
        }
    }

    /// Check if a report for this hazard type may be sent now
    pub fn should_report(&mut self, hazard_type: &str, now: Instant) -> bool {
        if now.saturating_duration_since(self.hour_start) > Duration::from_secs(3600) {
            self.hourly_count = 0;
            self.hour_start = now;
        }

        if self.hourly_count >= self.config.max_reports_per_hour {
            warn!("Hazard report throttled: max reports per hour reached");
            return false;
        }

        if let Some(last) = self.last_sent.get(hazard_type) {
            let cooldown = Duration::from_secs(self.config.cooldown_seconds);
            if now.saturating_duration_since(*last) < cooldown {
                debug!("Hazard report suppressed: {} in cooldown", hazard_type);
                return false;
            }
        }

        true
    }

    /// Record that a report was sent
    pub fn record(&mut self, hazard_type: &str, now: Instant) {
        self.hourly_count += 1;
        self.last_sent.insert(hazard_type.to_string(), now);
        debug!("Hazard report recorded: {} (hourly: {})", hazard_type, self.hourly_count);
    }

    pub fn hourly_count(&self) -> usize {
        self.hourly_count
    }
}

impl Default for ReportThrottle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}
