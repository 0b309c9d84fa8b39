//! Absolute-deadline scheduler.

use std::time::{Duration, Instant};

use crate::error::{RTError, RTResult};
use crate::rt_setup::RTSetup;

#[cfg(target_os = "windows")]
use crate::windows::PlatformSleep;

#[cfg(target_os = "linux")]
use crate::linux::PlatformSleep;

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
use crate::fallback::PlatformSleep;

/// Timing statistics kept by the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Ticks returned, including late ones
    pub total_ticks: u64,
    /// Ticks that woke more than a full period late
    pub missed_ticks: u64,
    /// Wake-up error of the most recent tick
    pub last_jitter_ns: u64,
    /// Largest wake-up error seen
    pub max_jitter_ns: u64,
}

/// Fixed-rate scheduler using absolute deadlines.
///
/// Each deadline is the previous deadline plus one period, so a slow cycle
/// does not shift the phase of the ones after it. When the loop falls more
/// than a full period behind, the scheduler re-anchors on the current time
/// instead of firing a burst of catch-up ticks.
///
/// `wait_for_tick` is O(1) and does not allocate.
pub struct AbsoluteScheduler {
    period: Duration,
    next_tick: Option<Instant>,
    tick_count: u64,
    stats: TickStats,
    rt_setup_applied: bool,
    platform_sleep: PlatformSleep,
}

impl AbsoluteScheduler {
    /// 1 kHz scheduler.
    pub fn new_1khz() -> Self {
        Self::with_period(Duration::from_nanos(crate::PERIOD_1KHZ_NS))
    }

    /// Scheduler running at `hz` ticks per second (at least 1).
    pub fn with_rate_hz(hz: u32) -> Self {
        let hz = u64::from(hz.max(1));
        Self::with_period(Duration::from_nanos(1_000_000_000 / hz))
    }

    pub fn with_period(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_nanos(1)),
            next_tick: None,
            tick_count: 0,
            stats: TickStats::default(),
            rt_setup_applied: false,
            platform_sleep: PlatformSleep::new(),
        }
    }

    /// Apply thread priority settings to the calling thread. Call from the loop thread.
    ///
    /// # Errors
    ///
    /// Returns [`RTError::RTSetupFailed`] if the platform rejected the priority change.
    pub fn apply_rt_setup(&mut self, setup: &RTSetup) -> RTResult {
        if self.rt_setup_applied {
            return Ok(());
        }
        self.platform_sleep.apply_rt_setup(setup)?;
        self.rt_setup_applied = true;
        Ok(())
    }

    /// Block until the next deadline and return the tick number (starting at 1).
    ///
    /// # Errors
    ///
    /// Returns [`RTError::TimingViolation`] when the call arrived more than one
    /// full period after its deadline. The tick still counts and the schedule
    /// is re-anchored, so the caller can run its cycle and carry on.
    pub fn wait_for_tick(&mut self) -> RTResult<u64> {
        let now = Instant::now();
        let deadline = *self.next_tick.get_or_insert(now + self.period);

        let late = now.checked_duration_since(deadline);
        if late.is_none() {
            self.platform_sleep.sleep_until(deadline)?;
        }

        let woke = Instant::now();
        let jitter_ns = duration_ns(woke.saturating_duration_since(deadline));
        self.tick_count = self.tick_count.saturating_add(1);
        self.stats.total_ticks = self.tick_count;
        self.stats.last_jitter_ns = jitter_ns;
        self.stats.max_jitter_ns = self.stats.max_jitter_ns.max(jitter_ns);

        match late {
            Some(behind) if behind >= self.period => {
                self.stats.missed_ticks = self.stats.missed_ticks.saturating_add(1);
                self.next_tick = Some(woke + self.period);
                Err(RTError::TimingViolation)
            }
            _ => {
                self.next_tick = Some(deadline + self.period);
                Ok(self.tick_count)
            }
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    /// Forget the schedule; the next tick is one period after the next call.
    pub fn reset(&mut self) {
        self.next_tick = None;
        self.tick_count = 0;
        self.stats = TickStats::default();
    }
}

fn duration_ns(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
