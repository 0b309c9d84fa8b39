//! Pedal to physical axis mapping.

use openpedal_errors::ValidationError;
use serde::{Deserialize, Serialize};

use crate::Pedal;

/// Maps each pedal to a physical axis index on the input device.
///
/// A negative index marks the pedal as unavailable. Persisted as
/// `{"throttle": 0, "brake": 1, "clutch": 2, "handbrake": -1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisMapping {
    pub throttle: i32,
    pub brake: i32,
    pub clutch: i32,
    pub handbrake: i32,
}

impl Default for AxisMapping {
    fn default() -> Self {
        Self {
            throttle: 0,
            brake: 1,
            clutch: 2,
            handbrake: 3,
        }
    }
}

impl AxisMapping {
    /// Marker for a pedal with no physical axis.
    pub const UNAVAILABLE: i32 = -1;

    /// Stored index for a pedal, including the unavailable marker.
    pub fn raw(&self, pedal: Pedal) -> i32 {
        match pedal {
            Pedal::Throttle => self.throttle,
            Pedal::Brake => self.brake,
            Pedal::Clutch => self.clutch,
            Pedal::Handbrake => self.handbrake,
        }
    }

    /// Physical axis for a pedal, or `None` when unavailable.
    pub fn axis(&self, pedal: Pedal) -> Option<usize> {
        usize::try_from(self.raw(pedal)).ok()
    }

    fn slot_mut(&mut self, pedal: Pedal) -> &mut i32 {
        match pedal {
            Pedal::Throttle => &mut self.throttle,
            Pedal::Brake => &mut self.brake,
            Pedal::Clutch => &mut self.clutch,
            Pedal::Handbrake => &mut self.handbrake,
        }
    }

    pub fn set_unavailable(&mut self, pedal: Pedal) {
        *self.slot_mut(pedal) = Self::UNAVAILABLE;
    }

    /// Force every mapping that does not exist on a device with `axis_count`
    /// axes to unavailable.
    ///
    /// Returns the pedals that were changed so the caller can persist the
    /// corrected mapping.
    pub fn validate(&mut self, axis_count: usize) -> Vec<Pedal> {
        let mut changed = Vec::new();
        for pedal in Pedal::ALL {
            let raw = self.raw(pedal);
            let valid = match usize::try_from(raw) {
                Ok(axis) => axis < axis_count,
                Err(_) => raw == Self::UNAVAILABLE,
            };
            if !valid {
                self.set_unavailable(pedal);
                changed.push(pedal);
            }
        }
        changed
    }

    /// Point a pedal at a new axis, or at [`AxisMapping::UNAVAILABLE`] to disable it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidMapping`] when the axis does not exist
    /// on a device with `axis_count` axes.
    pub fn update(
        &mut self,
        pedal: Pedal,
        axis: i32,
        axis_count: usize,
    ) -> Result<(), ValidationError> {
        let valid = match usize::try_from(axis) {
            Ok(index) => index < axis_count,
            Err(_) => axis == Self::UNAVAILABLE,
        };
        if !valid {
            return Err(ValidationError::InvalidMapping {
                pedal: pedal.to_string(),
                axis,
                axis_count,
            });
        }
        *self.slot_mut(pedal) = axis;
        Ok(())
    }
}
