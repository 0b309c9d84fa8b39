//! Output Sink: slot acquisition and per-cycle writes.

use std::time::{Duration, Instant};

use openpedal_calibration::PedalSnapshot;
use tracing::{debug, info, warn};

use crate::driver::{AxisUsage, SlotStatus, VirtualOutputDriver};
use crate::log_limit::LogLimiter;
use crate::OutputResult;
use openpedal_errors::OutputError;

/// Simulated writes between two diagnostic log lines.
const SIMULATED_LOG_EVERY: u64 = 1000;
const WRITE_ERROR_LOG_WINDOW: Duration = Duration::from_secs(5);
const PERF_LOG_WINDOW: Duration = Duration::from_secs(10);

/// Slots to try and how hard to try them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub primary_id: u32,
    pub alternate_ids: Vec<u32>,
    /// Status checks per slot while it reports `Busy`
    pub attempts_per_id: u32,
    pub busy_backoff: Duration,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            primary_id: 1,
            alternate_ids: vec![2, 3, 4],
            attempts_per_id: 3,
            busy_backoff: Duration::from_millis(500),
        }
    }
}

impl OutputConfig {
    /// Primary first, then alternates, without duplicates.
    pub fn candidates(&self) -> Vec<u32> {
        let mut ids = vec![self.primary_id];
        for id in &self.alternate_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}

/// Which handle the sink is writing to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Acquired(u32),
    /// No slot: writes are accepted and dropped
    Simulated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub writes: u64,
    pub skipped_unchanged: u64,
    pub errors: u64,
    pub simulated_writes: u64,
}

/// Owns one virtual joystick slot for the lifetime of the pipeline.
pub struct OutputSink {
    driver: Box<dyn VirtualOutputDriver>,
    config: OutputConfig,
    state: SinkState,
    last_written: Option<[u16; 4]>,
    stats: SinkStats,
    error_log: LogLimiter,
    perf_log: LogLimiter,
    perf_baseline: SinkStats,
}

impl OutputSink {
    /// New sink in simulated mode; call [`OutputSink::acquire`] to take a slot.
    pub fn new(driver: Box<dyn VirtualOutputDriver>, config: OutputConfig) -> Self {
        Self {
            driver,
            config,
            state: SinkState::Simulated,
            last_written: None,
            stats: SinkStats::default(),
            error_log: LogLimiter::new(WRITE_ERROR_LOG_WINDOW),
            perf_log: LogLimiter::armed(PERF_LOG_WINDOW, Instant::now()),
            perf_baseline: SinkStats::default(),
        }
    }

    /// Acquire the first obtainable slot, trying the primary and then each alternate.
    ///
    /// `Missing` slots are skipped at once; `Busy` slots are re-checked up to
    /// `attempts_per_id` times with `busy_backoff` in between. Blocks for the
    /// backoff, so call it at startup only.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::AcquireFailed`] when no slot could be taken. The
    /// sink is then in simulated mode and keeps accepting writes.
    pub fn acquire(&mut self) -> OutputResult<u32> {
        if let SinkState::Acquired(slot) = self.state {
            return Ok(slot);
        }

        let candidates = self.config.candidates();
        for &slot in &candidates {
            if self.try_slot(slot) {
                self.state = SinkState::Acquired(slot);
                self.last_written = None;
                info!(slot, "Acquired virtual output slot");
                return Ok(slot);
            }
        }

        self.state = SinkState::Simulated;
        warn!(
            tried = ?candidates,
            "No virtual output slot available, running in simulated mode"
        );
        Err(OutputError::AcquireFailed {
            attempted: candidates.len(),
        })
    }

    fn try_slot(&mut self, slot: u32) -> bool {
        let attempts = self.config.attempts_per_id.max(1);
        for attempt in 1..=attempts {
            let busy = match self.driver.status(slot) {
                SlotStatus::OwnedBySelf => return true,
                SlotStatus::Missing => {
                    debug!(slot, "Virtual output slot missing, skipping");
                    return false;
                }
                SlotStatus::Free => match self.driver.acquire(slot) {
                    Ok(()) => return true,
                    Err(OutputError::SlotBusy(_)) => true,
                    Err(e) => {
                        debug!(slot, error = %e, "Virtual output slot acquire failed, skipping");
                        return false;
                    }
                },
                SlotStatus::Busy => true,
            };

            if busy && attempt < attempts {
                debug!(slot, attempt, "Virtual output slot busy, backing off");
                std::thread::sleep(self.config.busy_backoff);
            }
        }
        debug!(slot, attempts, "Virtual output slot still busy, moving on");
        false
    }

    /// Write the four pedal channels.
    ///
    /// Returns `false` only when the driver rejected a write; the values are
    /// then written again on the next call. Unchanged values and simulated
    /// mode return `true` without touching the driver.
    pub fn write(&mut self, throttle: u16, brake: u16, clutch: u16, handbrake: u16) -> bool {
        let values = [throttle, brake, clutch, handbrake];
        let ok = match self.state {
            SinkState::Simulated => {
                self.stats.simulated_writes = self.stats.simulated_writes.saturating_add(1);
                if self.stats.simulated_writes % SIMULATED_LOG_EVERY == 1 {
                    debug!(
                        calls = self.stats.simulated_writes,
                        throttle, brake, clutch, handbrake, "Simulated output write"
                    );
                }
                true
            }
            SinkState::Acquired(slot) => self.write_slot(slot, values),
        };
        self.maybe_log_perf();
        ok
    }

    /// Convenience wrapper over [`OutputSink::write`].
    pub fn write_snapshot(&mut self, values: &PedalSnapshot) -> bool {
        self.write(values.throttle, values.brake, values.clutch, values.handbrake)
    }

    fn write_slot(&mut self, slot: u32, values: [u16; 4]) -> bool {
        if self.last_written == Some(values) {
            self.stats.skipped_unchanged = self.stats.skipped_unchanged.saturating_add(1);
            return true;
        }

        let previous = self.last_written;
        let mut batch = [(AxisUsage::X, 0u16); 4];
        let mut changed = 0usize;
        for (index, (usage, value)) in AxisUsage::PEDAL_ORDER.into_iter().zip(values).enumerate() {
            let unchanged = previous.and_then(|p| p.get(index).copied()) == Some(value);
            if unchanged {
                continue;
            }
            if let Some(entry) = batch.get_mut(changed) {
                *entry = (usage, value);
                changed = changed.saturating_add(1);
            }
        }

        let channels = batch.get(..changed).unwrap_or(&[]);
        if let Err(e) = self.driver.set_axes(slot, channels) {
            self.stats.errors = self.stats.errors.saturating_add(1);
            // Forget what was written so every channel goes out again next cycle.
            self.last_written = None;
            if let Some(suppressed) = self.error_log.allow(Instant::now()) {
                warn!(slot, error = %e, suppressed, "Virtual output write failed");
            }
            return false;
        }

        self.last_written = Some(values);
        self.stats.writes = self.stats.writes.saturating_add(1);
        true
    }

    fn maybe_log_perf(&mut self) {
        if self.perf_log.allow(Instant::now()).is_none() {
            return;
        }
        let base = self.perf_baseline;
        let now = self.stats;
        if now != base {
            debug!(
                writes = now.writes.saturating_sub(base.writes),
                skipped_unchanged = now.skipped_unchanged.saturating_sub(base.skipped_unchanged),
                errors = now.errors.saturating_sub(base.errors),
                simulated = now.simulated_writes.saturating_sub(base.simulated_writes),
                "Output sink performance"
            );
        }
        self.perf_baseline = now;
    }

    pub fn state(&self) -> SinkState {
        self.state
    }

    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Relinquish the acquired slot. Later writes run simulated.
    pub fn shutdown(&mut self) {
        if let SinkState::Acquired(slot) = self.state {
            self.driver.relinquish(slot);
            info!(slot, "Released virtual output slot");
        }
        self.state = SinkState::Simulated;
        self.last_written = None;
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}
