//! Linux thread priority and high-resolution sleep.

#![expect(unsafe_code, reason = "libc scheduling and sleep calls")]

use std::time::{Duration, Instant};

use libc::{CLOCK_MONOTONIC, MCL_CURRENT, MCL_FUTURE, SCHED_FIFO, sched_param, timespec};
use tracing::warn;

use crate::SPIN_TAIL_NS;
use crate::error::{RTError, RTResult};
use crate::rt_setup::RTSetup;

const FIFO_PRIORITY: i32 = 80;

pub struct PlatformSleep;

impl PlatformSleep {
    pub fn new() -> Self {
        Self
    }

    /// Apply SCHED_FIFO and memory locking to the calling thread.
    ///
    /// Missing privileges are not fatal: the loop still runs at normal priority.
    pub fn apply_rt_setup(&mut self, setup: &RTSetup) -> RTResult {
        if setup.high_priority {
            let param = sched_param {
                sched_priority: FIFO_PRIORITY,
            };
            // SAFETY: `param` is a valid sched_param for the duration of the call; pid 0 is the calling thread.
            let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
            if rc != 0 {
                warn!(
                    error = %std::io::Error::last_os_error(),
                    "SCHED_FIFO unavailable, input loop runs at normal priority"
                );
            }
        }

        if setup.lock_memory {
            // SAFETY: mlockall takes only flags and touches no Rust-managed memory.
            let rc = unsafe { libc::mlockall(MCL_CURRENT | MCL_FUTURE) };
            if rc != 0 {
                warn!(error = %std::io::Error::last_os_error(), "mlockall failed");
            }
        }

        Ok(())
    }

    /// Sleep with clock_nanosleep until the spin window, then busy-spin to `target`.
    pub fn sleep_until(&mut self, target: Instant) -> RTResult {
        let Some(remaining) = target.checked_duration_since(Instant::now()) else {
            return Ok(());
        };

        let coarse = remaining.saturating_sub(Duration::from_nanos(SPIN_TAIL_NS));
        if !coarse.is_zero() {
            let ts = timespec {
                tv_sec: libc::time_t::try_from(coarse.as_secs()).unwrap_or(libc::time_t::MAX),
                // Below one second, so it fits any c_long
                tv_nsec: libc::c_long::try_from(coarse.subsec_nanos()).unwrap_or(0),
            };
            // SAFETY: `ts` outlives the call and the remainder pointer may be null for relative sleeps.
            let rc = unsafe { libc::clock_nanosleep(CLOCK_MONOTONIC, 0, &ts, std::ptr::null_mut()) };
            if rc != 0 && rc != libc::EINTR {
                return Err(RTError::TimingViolation);
            }
        }

        while Instant::now() < target {
            std::hint::spin_loop();
        }
        Ok(())
    }
}

impl Default for PlatformSleep {
    fn default() -> Self {
        Self::new()
    }
}
