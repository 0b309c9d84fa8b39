//! Time-window limiter for diagnostic logs on the write path.

use std::time::{Duration, Instant};

/// Allows one event per window and counts the ones it suppressed.
#[derive(Debug)]
pub struct LogLimiter {
    window: Duration,
    last: Option<Instant>,
    suppressed: u64,
}

impl LogLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: None,
            suppressed: 0,
        }
    }

    /// Returns the number of events suppressed since the last allowed one,
    /// or `None` if this event falls inside the current window.
    pub fn allow(&mut self, now: Instant) -> Option<u64> {
        if let Some(last) = self.last
            && now.saturating_duration_since(last) < self.window
        {
            self.suppressed = self.suppressed.saturating_add(1);
            return None;
        }
        self.last = Some(now);
        Some(std::mem::take(&mut self.suppressed))
    }

    /// Limiter whose first window starts at `now` instead of at the first event.
    pub fn armed(window: Duration, now: Instant) -> Self {
        Self {
            window,
            last: Some(now),
            suppressed: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_event_per_window() {
        let mut limiter = LogLimiter::new(Duration::from_secs(5));
        let start = Instant::now();

        assert_eq!(limiter.allow(start), Some(0));
        assert_eq!(limiter.allow(start + Duration::from_secs(1)), None);
        assert_eq!(limiter.allow(start + Duration::from_secs(4)), None);
        assert_eq!(limiter.allow(start + Duration::from_secs(5)), Some(2));
        assert_eq!(limiter.allow(start + Duration::from_secs(6)), None);
    }

    #[test]
    fn test_armed_limiter_waits_a_window() {
        let start = Instant::now();
        let mut limiter = LogLimiter::armed(Duration::from_secs(10), start);
        assert_eq!(limiter.allow(start + Duration::from_secs(9)), None);
        assert_eq!(limiter.allow(start + Duration::from_secs(10)), Some(1));
    }
}
