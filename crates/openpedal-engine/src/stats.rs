//! Per-window frame timing.

use std::time::Duration;

/// Timing summary over a window of loop cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub cycles: u64,
    pub min_ns: u64,
    pub avg_ns: u64,
    pub max_ns: u64,
    pub slow_frames: u64,
    pub missed_deadlines: u64,
}

/// Accumulates frame times in the loop; fixed size, never allocates.
#[derive(Debug, Clone)]
pub(crate) struct FrameWindow {
    cycles: u64,
    total_ns: u64,
    min_ns: u64,
    max_ns: u64,
    slow_frames: u64,
    missed_deadlines: u64,
}

impl FrameWindow {
    pub(crate) fn new() -> Self {
        Self {
            cycles: 0,
            total_ns: 0,
            min_ns: u64::MAX,
            max_ns: 0,
            slow_frames: 0,
            missed_deadlines: 0,
        }
    }

    /// Record one cycle; returns whether it was slow.
    #[inline]
    pub(crate) fn record(&mut self, elapsed: Duration, slow_threshold: Duration) -> bool {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.cycles = self.cycles.saturating_add(1);
        self.total_ns = self.total_ns.saturating_add(ns);
        self.min_ns = self.min_ns.min(ns);
        self.max_ns = self.max_ns.max(ns);
        let slow = elapsed > slow_threshold;
        if slow {
            self.slow_frames = self.slow_frames.saturating_add(1);
        }
        slow
    }

    #[inline]
    pub(crate) fn record_missed(&mut self) {
        self.missed_deadlines = self.missed_deadlines.saturating_add(1);
    }

    pub(crate) fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Summary of the window so far; the window starts over.
    pub(crate) fn take(&mut self) -> FrameStats {
        let stats = FrameStats {
            cycles: self.cycles,
            min_ns: if self.cycles == 0 { 0 } else { self.min_ns },
            avg_ns: self.total_ns.checked_div(self.cycles).unwrap_or(0),
            max_ns: self.max_ns,
            slow_frames: self.slow_frames,
            missed_deadlines: self.missed_deadlines,
        };
        *self = Self::new();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_summary() {
        let threshold = Duration::from_millis(2);
        let mut window = FrameWindow::new();
        assert!(!window.record(Duration::from_micros(100), threshold));
        assert!(!window.record(Duration::from_micros(300), threshold));
        assert!(window.record(Duration::from_millis(3), threshold));
        window.record_missed();

        let stats = window.take();
        assert_eq!(stats.cycles, 3);
        assert_eq!(stats.min_ns, 100_000);
        assert_eq!(stats.max_ns, 3_000_000);
        assert_eq!(stats.avg_ns, 1_133_333);
        assert_eq!(stats.slow_frames, 1);
        assert_eq!(stats.missed_deadlines, 1);

        assert_eq!(window.cycles(), 0);
        assert_eq!(window.take(), FrameStats::default());
    }
}
