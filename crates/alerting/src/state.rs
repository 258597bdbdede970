//! In-lane hazard warning state machine
//!
//! Raises the instant a lane hazard is reported. Clearing waits for
//! `clear_delay_ms` of uninterrupted zero counts so that momentary
//! detection gaps do not flap the warning.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Quiet period before an active warning clears (default: 3000)
    pub clear_delay_ms: u64,
    /// Text shown while the warning is active
    pub message: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            clear_delay_ms: 3000,
            message: "Road hazard detected in your lane! Reducing speed".to_string(),
        }
    }
}

impl AlertConfig {
    pub fn clear_delay(&self) -> Duration {
        Duration::from_millis(self.clear_delay_ms)
    }
}

/// Externally visible phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum AlertPhase {
    #[default]
    Idle,
    Warning,
}

/// State of the single per-session warning
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    /// Warning engaged
    pub active: bool,
    /// When the current warning was raised
    pub raised_at: Option<Instant>,
    /// Deadline of the armed clear timer
    pub pending_clear: Option<Instant>,
}

/// Edge produced by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTransition {
    Raised,
    Cleared,
}

/// Lane hazard warning with hysteresis
#[derive(Debug, Clone)]
pub struct HazardAlert {
    config: AlertConfig,
    state: AlertState,
}

impl HazardAlert {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            state: AlertState::default(),
        }
    }

    /// Feed the lane hazard count from one telemetry message
    pub fn on_lane_count(&mut self, count: u32, now: Instant) -> Option<AlertTransition> {
        if count > 0 {
            if self.state.pending_clear.take().is_some() {
                debug!("Hazard back in lane, clear timer cancelled");
            }
            if !self.state.active {
                self.state.active = true;
                self.state.raised_at = Some(now);
                info!("Lane hazard warning raised ({} in lane)", count);
                return Some(AlertTransition::Raised);
            }
            return None;
        }

        if self.state.active && self.state.pending_clear.is_none() {
            self.state.pending_clear = Some(now + self.config.clear_delay());
            debug!("Lane clear, warning dismisses in {}ms", self.config.clear_delay_ms);
        }
        None
    }

    /// Fire the clear timer if its deadline has passed
    pub fn on_timer(&mut self, now: Instant) -> Option<AlertTransition> {
        match self.state.pending_clear {
            Some(deadline) if now >= deadline => {
                self.state.pending_clear = None;
                self.deactivate()
            }
            _ => None,
        }
    }

    /// Cancel the clear timer and drop any active warning
    pub fn dismiss(&mut self) -> Option<AlertTransition> {
        self.state.pending_clear = None;
        self.deactivate()
    }

    fn deactivate(&mut self) -> Option<AlertTransition> {
        if !self.state.active {
            return None;
        }
        let held = self
            .state
            .raised_at
            .take()
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        self.state.active = false;
        info!("Lane hazard warning cleared after {}ms", held);
        Some(AlertTransition::Cleared)
    }

    /// Deadline to arm the clear timer for
    pub fn clear_deadline(&self) -> Option<Instant> {
        self.state.pending_clear
    }

    pub fn phase(&self) -> AlertPhase {
        if self.state.active {
            AlertPhase::Warning
        } else {
            AlertPhase::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }
}

impl Default for HazardAlert {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_instant_raise() {
        let mut alert = HazardAlert::default();
        let t0 = Instant::now();

        assert_eq!(alert.on_lane_count(2, t0), Some(AlertTransition::Raised));
        assert_eq!(alert.phase(), AlertPhase::Warning);
        // Already raised, no second edge
        assert_eq!(alert.on_lane_count(1, t0 + ms(10)), None);
    }

    #[test]
    fn test_zero_in_idle_arms_nothing() {
        let mut alert = HazardAlert::default();
        assert_eq!(alert.on_lane_count(0, Instant::now()), None);
        assert_eq!(alert.clear_deadline(), None);
    }

    #[test]
    fn test_delayed_clear() {
        let mut alert = HazardAlert::default();
        let t0 = Instant::now();
        alert.on_lane_count(1, t0);
        alert.on_lane_count(0, t0 + ms(100));

        assert_eq!(alert.clear_deadline(), Some(t0 + ms(3100)));
        assert_eq!(alert.on_timer(t0 + ms(3099)), None);
        assert!(alert.is_active());
        assert_eq!(alert.on_timer(t0 + ms(3100)), Some(AlertTransition::Cleared));
        assert_eq!(alert.phase(), AlertPhase::Idle);
        assert_eq!(alert.clear_deadline(), None);
    }

    #[test]
    fn test_repeated_zero_does_not_rearm() {
        let mut alert = HazardAlert::default();
        let t0 = Instant::now();
        alert.on_lane_count(1, t0);
        alert.on_lane_count(0, t0);
        alert.on_lane_count(0, t0 + ms(2000));
        assert_eq!(alert.clear_deadline(), Some(t0 + ms(3000)));
    }

    #[test]
    fn test_nonzero_at_2999_resets_timer() {
        let mut alert = HazardAlert::default();
        let t0 = Instant::now();
        alert.on_lane_count(1, t0);
        alert.on_lane_count(0, t0);
        assert_eq!(alert.on_lane_count(1, t0 + ms(2999)), None);
        assert_eq!(alert.clear_deadline(), None);

        // First deadline passes without effect
        assert_eq!(alert.on_timer(t0 + ms(3000)), None);
        assert!(alert.is_active());

        alert.on_lane_count(0, t0 + ms(3500));
        assert_eq!(alert.clear_deadline(), Some(t0 + ms(6500)));
    }

    #[test]
    fn test_dismiss() {
        let mut alert = HazardAlert::default();
        let t0 = Instant::now();
        alert.on_lane_count(3, t0);
        alert.on_lane_count(0, t0);
        assert_eq!(alert.dismiss(), Some(AlertTransition::Cleared));
        assert_eq!(alert.clear_deadline(), None);
        assert_eq!(alert.dismiss(), None);
    }

    proptest! {
        /// Any gap shorter than the clear delay keeps the warning up
        #[test]
        fn prop_short_gaps_never_clear(gaps in proptest::collection::vec(0u64..3000, 1..20)) {
            let mut alert = HazardAlert::default();
            let mut now = Instant::now();
            alert.on_lane_count(1, now);
            for gap in gaps {
                alert.on_lane_count(0, now);
                now += ms(gap);
                prop_assert_eq!(alert.on_timer(now), None);
                alert.on_lane_count(1, now);
                prop_assert!(alert.is_active());
            }
        }
    }
}
