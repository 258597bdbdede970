//! Alerting System
//!
//! Provides the in-lane hazard warning (instant raise, delayed clear),
//! the audible/visual sinks it drives, and throttling for hazard reports.

mod sink;
mod state;
mod throttle;

pub use sink::{AlertSink, AlertTone, HazardWarning, LogAlertSink};
pub use state::{AlertConfig, AlertPhase, AlertState, AlertTransition, HazardAlert};
pub use throttle::{ReportThrottle, ThrottleConfig};
