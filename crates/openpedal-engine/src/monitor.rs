//! Latest raw reading, shared without locks.
//!
//! The four 16-bit pedal values fit in one `u64`, so the loop can publish
//! them with a single relaxed store and readers never see a torn snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use openpedal_calibration::PedalSnapshot;

#[derive(Debug, Clone, Default)]
pub struct RawMonitor {
    packed: Arc<AtomicU64>,
}

fn pack(snapshot: &PedalSnapshot) -> u64 {
    u64::from(snapshot.throttle)
        | (u64::from(snapshot.brake) << 16)
        | (u64::from(snapshot.clutch) << 32)
        | (u64::from(snapshot.handbrake) << 48)
}

fn unpack(packed: u64) -> PedalSnapshot {
    let lane = |shift: u32| u16::try_from((packed >> shift) & 0xFFFF).unwrap_or(u16::MAX);
    PedalSnapshot::new(lane(0), lane(16), lane(32), lane(48))
}

impl RawMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn store(&self, snapshot: &PedalSnapshot) {
        self.packed.store(pack(snapshot), Ordering::Relaxed);
    }

    pub fn load(&self) -> PedalSnapshot {
        unpack(self.packed.load(Ordering::Relaxed))
    }
}
