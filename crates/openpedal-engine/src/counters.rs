//! Lock-free counters updated from the input loop.
//!
//! Every increment is a single relaxed atomic add: no allocation, no
//! blocking, no syscalls. Readers take a [`CounterSnapshot`].

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    /// Loop cycles completed
    pub cycles: u64,
    /// Ticks that woke more than a full period late
    pub missed_deadlines: u64,
    /// Cycles slower than the slow-frame threshold
    pub slow_frames: u64,
    /// Virtual output writes that failed
    pub write_failures: u64,
    /// Frames pushed to the observer slot
    pub snapshots_published: u64,
    /// Timing summaries dropped because the observer fell behind
    pub stats_dropped: u64,
    /// Explicit device re-acquires performed
    pub reacquires: u64,
}

#[derive(Debug, Default)]
pub struct AtomicCounters {
    cycles: AtomicU64,
    missed_deadlines: AtomicU64,
    slow_frames: AtomicU64,
    write_failures: AtomicU64,
    snapshots_published: AtomicU64,
    stats_dropped: AtomicU64,
    reacquires: AtomicU64,
}

impl AtomicCounters {
    pub const fn new() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            missed_deadlines: AtomicU64::new(0),
            slow_frames: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            snapshots_published: AtomicU64::new(0),
            stats_dropped: AtomicU64::new(0),
            reacquires: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn inc_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_missed_deadline(&self) {
        self.missed_deadlines.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_slow_frame(&self) {
        self.slow_frames.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_snapshot_published(&self) {
        self.snapshots_published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_stats_dropped(&self) {
        self.stats_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_reacquire(&self) {
        self.reacquires.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            missed_deadlines: self.missed_deadlines.load(Ordering::Relaxed),
            slow_frames: self.slow_frames.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            snapshots_published: self.snapshots_published.load(Ordering::Relaxed),
            stats_dropped: self.stats_dropped.load(Ordering::Relaxed),
            reacquires: self.reacquires.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = AtomicCounters::new();
        counters.inc_cycle();
        counters.inc_cycle();
        counters.inc_missed_deadline();
        counters.inc_write_failure();

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.cycles, 2);
        assert_eq!(snapshot.missed_deadlines, 1);
        assert_eq!(snapshot.write_failures, 1);
        assert_eq!(snapshot.slow_frames, 0);
    }
}
