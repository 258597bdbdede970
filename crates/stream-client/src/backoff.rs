//! Reconnection backoff

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff with jitter and a hard ceiling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// First retry delay (ms)
    pub base_ms: u64,
    /// Ceiling for any delay (ms)
    pub max_ms: u64,
    /// Retry count past which the delay stops doubling
    pub max_exponent: u32,
    /// Upper bound (exclusive) of the random jitter added to each delay (ms)
    pub jitter_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_ms: 1000,
            max_ms: 30_000,
            max_exponent: 6,
            jitter_ms: 500,
        }
    }
}

impl ReconnectPolicy {
    /// Delay for a given retry count with an explicit jitter
    pub fn delay_with_jitter(&self, retry: u32, jitter_ms: u64) -> Duration {
        let exponent = retry.min(self.max_exponent).min(63);
        let unjittered = self.base_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(unjittered.saturating_add(jitter_ms).min(self.max_ms))
    }

    /// Delay for a given retry count with random jitter
    pub fn next_delay(&self, retry: u32) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..self.jitter_ms)
        };
        self.delay_with_jitter(retry, jitter)
    }
}

/// Decides which transport faults get logged during long outages.
///
/// Only affects logging, never the retry schedule.
#[derive(Debug, Clone, Copy)]
pub struct LogThrottle {
    pub error_every: u32,
    pub close_every: u32,
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self {
            error_every: 10,
            close_every: 3,
        }
    }
}

impl LogThrottle {
    pub fn log_error(&self, retry: u32) -> bool {
        retry % self.error_every.max(1) == 0
    }

    pub fn log_close(&self, retry: u32) -> bool {
        retry % self.close_every.max(1) == 0
    }
}
