//! Rolling frames-per-second counter

use std::time::Duration;
use tokio::time::Instant;

/// Length of one counting window
pub const FPS_WINDOW: Duration = Duration::from_millis(1000);

/// Counts successful paints and publishes once per window
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frame_count: u32,
    window_start: Instant,
    current: u32,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            frame_count: 0,
            window_start: now,
            current: 0,
        }
    }

    /// Record one paint. Returns the published value when the window closes.
    pub fn record_paint(&mut self, now: Instant) -> Option<u32> {
        self.frame_count += 1;
        if now.saturating_duration_since(self.window_start) >= FPS_WINDOW {
            self.current = self.frame_count;
            self.frame_count = 0;
            self.window_start = now;
            return Some(self.current);
        }
        None
    }

    /// Last published value
    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn reset(&mut self, now: Instant) {
        *self = Self::new(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_publishes_after_window() {
        let start = Instant::now();
        let mut fps = FpsCounter::new(start);

        for i in 1..30u64 {
            assert_eq!(fps.record_paint(start + Duration::from_millis(i * 33)), None);
        }
        // 30th paint lands at 1000ms and closes the window
        assert_eq!(fps.record_paint(start + Duration::from_millis(1000)), Some(30));
        assert_eq!(fps.current(), 30);
    }

    #[test]
    fn test_window_restarts_at_publish() {
        let start = Instant::now();
        let mut fps = FpsCounter::new(start);
        assert_eq!(fps.record_paint(start + Duration::from_millis(1200)), Some(1));

        assert_eq!(fps.record_paint(start + Duration::from_millis(1700)), None);
        assert_eq!(fps.record_paint(start + Duration::from_millis(2199)), None);
        assert_eq!(fps.record_paint(start + Duration::from_millis(2200)), Some(3));
    }

    #[test]
    fn test_no_paints_no_publish() {
        let fps = FpsCounter::new(Instant::now());
        assert_eq!(fps.current(), 0);
    }

    proptest! {
        #[test]
        fn prop_publishes_paints_per_window(gaps in prop::collection::vec(0u64..400, 1..200)) {
            let start = Instant::now();
            let mut fps = FpsCounter::new(start);
            let mut window_start = start;
            let mut paints_in_window = 0u32;
            let mut now = start;

            for gap in gaps {
                now += Duration::from_millis(gap);
                paints_in_window += 1;
                let published = fps.record_paint(now);

                if now - window_start >= FPS_WINDOW {
                    prop_assert_eq!(published, Some(paints_in_window));
                    prop_assert_eq!(fps.current(), paints_in_window);
                    window_start = now;
                    paints_in_window = 0;
                } else {
                    prop_assert_eq!(published, None);
                }
            }
        }
    }
}
