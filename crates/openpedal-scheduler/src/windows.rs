//! Windows thread priority and waitable-timer sleep.

#![expect(unsafe_code, reason = "Win32 threading and timer calls")]

use std::time::{Duration, Instant};

use tracing::warn;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Threading::{
    CreateWaitableTimerW, GetCurrentThread, INFINITE, SetThreadPriority, SetWaitableTimer,
    THREAD_PRIORITY_TIME_CRITICAL, WaitForSingleObject,
};

use crate::SPIN_TAIL_NS;
use crate::error::{RTError, RTResult};
use crate::rt_setup::RTSetup;

pub struct PlatformSleep {
    timer: Option<HANDLE>,
}

impl PlatformSleep {
    pub fn new() -> Self {
        Self { timer: None }
    }

    /// Raise the calling thread to TIME_CRITICAL.
    pub fn apply_rt_setup(&mut self, setup: &RTSetup) -> RTResult {
        if setup.high_priority {
            // SAFETY: GetCurrentThread returns a pseudo-handle valid for the calling thread.
            let result = unsafe { SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_TIME_CRITICAL) };
            if let Err(e) = result {
                warn!(error = %e, "TIME_CRITICAL priority unavailable");
                return Err(RTError::setup_failed(e.code().0));
            }
        }
        Ok(())
    }

    /// Wait on a waitable timer until the spin window, then busy-spin to `target`.
    pub fn sleep_until(&mut self, target: Instant) -> RTResult {
        let Some(remaining) = target.checked_duration_since(Instant::now()) else {
            return Ok(());
        };

        let coarse = remaining.saturating_sub(Duration::from_nanos(SPIN_TAIL_NS));
        if !coarse.is_zero() {
            let timer = self.timer()?;
            let due = relative_due_time(coarse);
            // SAFETY: `timer` is a live handle owned by self and `due` outlives the call.
            let armed = unsafe { SetWaitableTimer(timer, &due, 0, None, None, false) };
            if armed.is_err() {
                return Err(RTError::TimingViolation);
            }
            // SAFETY: waiting on a handle owned by self.
            let _signaled = unsafe { WaitForSingleObject(timer, INFINITE) };
        }

        while Instant::now() < target {
            std::hint::spin_loop();
        }
        Ok(())
    }

    fn timer(&mut self) -> RTResult<HANDLE> {
        if let Some(handle) = self.timer {
            return Ok(handle);
        }
        // SAFETY: default security attributes and an unnamed manual-reset timer.
        let handle = unsafe { CreateWaitableTimerW(None, true, None) }
            .map_err(|e| RTError::setup_failed(e.code().0))?;
        self.timer = Some(handle);
        Ok(handle)
    }
}

impl Drop for PlatformSleep {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.take() {
            // SAFETY: the handle was created by CreateWaitableTimerW and is closed exactly once.
            if let Err(e) = unsafe { CloseHandle(handle) } {
                warn!(error = %e, "Failed to close waitable timer");
            }
        }
    }
}

impl Default for PlatformSleep {
    fn default() -> Self {
        Self::new()
    }
}

/// Relative due time in negative 100 ns units.
fn relative_due_time(duration: Duration) -> i64 {
    let ticks = i64::try_from(duration.as_nanos() / 100).unwrap_or(i64::MAX);
    -ticks.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_due_time_is_negative() {
        assert_eq!(relative_due_time(Duration::from_micros(1000)), -10_000);
        assert_eq!(relative_due_time(Duration::ZERO), -1);
    }
}
