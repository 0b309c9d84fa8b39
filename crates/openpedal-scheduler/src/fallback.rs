//! Portable sleep for platforms without a dedicated implementation.

use std::time::{Duration, Instant};

use crate::SPIN_TAIL_NS;
use crate::error::RTResult;
use crate::rt_setup::RTSetup;

pub struct PlatformSleep;

impl PlatformSleep {
    pub fn new() -> Self {
        Self
    }

    pub fn apply_rt_setup(&mut self, _setup: &RTSetup) -> RTResult {
        Ok(())
    }

    pub fn sleep_until(&mut self, target: Instant) -> RTResult {
        let Some(remaining) = target.checked_duration_since(Instant::now()) else {
            return Ok(());
        };
        let coarse = remaining.saturating_sub(Duration::from_nanos(SPIN_TAIL_NS));
        if !coarse.is_zero() {
            std::thread::sleep(coarse);
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
