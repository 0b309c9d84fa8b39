//! Pedal identifiers and the per-cycle raw snapshot.

use core::fmt;
use core::ops::{Index, IndexMut};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A logical analog control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pedal {
    Throttle,
    Brake,
    Clutch,
    Handbrake,
}

impl Pedal {
    /// All pedals in output-channel order.
    pub const ALL: [Pedal; 4] = [Pedal::Throttle, Pedal::Brake, Pedal::Clutch, Pedal::Handbrake];

    /// Lowercase name used in files and directories.
    pub fn as_str(self) -> &'static str {
        match self {
            Pedal::Throttle => "throttle",
            Pedal::Brake => "brake",
            Pedal::Clutch => "clutch",
            Pedal::Handbrake => "handbrake",
        }
    }

    /// Position of this pedal in [`Pedal::ALL`].
    pub fn index(self) -> usize {
        match self {
            Pedal::Throttle => 0,
            Pedal::Brake => 1,
            Pedal::Clutch => 2,
            Pedal::Handbrake => 3,
        }
    }
}

impl fmt::Display for Pedal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown pedal: {0}")]
pub struct UnknownPedal(pub String);

impl FromStr for Pedal {
    type Err = UnknownPedal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "throttle" => Ok(Pedal::Throttle),
            "brake" => Ok(Pedal::Brake),
            "clutch" => Ok(Pedal::Clutch),
            "handbrake" => Ok(Pedal::Handbrake),
            _ => Err(UnknownPedal(s.to_string())),
        }
    }
}

/// Raw or calibrated values for one poll cycle, in the canonical 0..=65535 range.
///
/// Produced every cycle and consumed immediately; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PedalSnapshot {
    pub throttle: u16,
    pub brake: u16,
    pub clutch: u16,
    pub handbrake: u16,
}

impl PedalSnapshot {
    pub const ZERO: PedalSnapshot = PedalSnapshot {
        throttle: 0,
        brake: 0,
        clutch: 0,
        handbrake: 0,
    };

    pub fn new(throttle: u16, brake: u16, clutch: u16, handbrake: u16) -> Self {
        Self {
            throttle,
            brake,
            clutch,
            handbrake,
        }
    }

    /// Values in [`Pedal::ALL`] order.
    pub fn as_array(&self) -> [u16; 4] {
        [self.throttle, self.brake, self.clutch, self.handbrake]
    }
}

impl Index<Pedal> for PedalSnapshot {
    type Output = u16;

    fn index(&self, pedal: Pedal) -> &u16 {
        match pedal {
            Pedal::Throttle => &self.throttle,
            Pedal::Brake => &self.brake,
            Pedal::Clutch => &self.clutch,
            Pedal::Handbrake => &self.handbrake,
        }
    }
}

impl IndexMut<Pedal> for PedalSnapshot {
    fn index_mut(&mut self, pedal: Pedal) -> &mut u16 {
        match pedal {
            Pedal::Throttle => &mut self.throttle,
            Pedal::Brake => &mut self.brake,
            Pedal::Clutch => &mut self.clutch,
            Pedal::Handbrake => &mut self.handbrake,
        }
    }
}
