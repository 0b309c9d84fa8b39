//! Raw axis range and deadzones.

use openpedal_errors::ValidationError;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{AXIS_MAX, Pedal};

/// Per-pedal raw range in device units plus deadzones in percent of travel.
///
/// # Examples
///
/// ```
/// use openpedal_calibration::{AxisRange, Pedal};
///
/// let range = AxisRange::new(1000, 60000).with_deadzones(5.0, 2.0);
/// assert!(range.validate(Pedal::Brake).is_ok());
/// assert!((range.normalize(1000) - 0.0).abs() < 1e-9);
/// assert!((range.normalize(60000) - 100.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisRange {
    /// Raw reading at the released position.
    pub min: i32,
    /// Raw reading at full travel.
    pub max: i32,
    /// Percent of travel near the released end that reads as 0.
    pub min_deadzone: f32,
    /// Percent of travel near full travel that reads as 100.
    pub max_deadzone: f32,
}

impl Default for AxisRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: i32::from(AXIS_MAX),
            min_deadzone: 0.0,
            max_deadzone: 0.0,
        }
    }
}

impl AxisRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self {
            min,
            max,
            ..Self::default()
        }
    }

    pub fn with_deadzones(mut self, min_deadzone: f32, max_deadzone: f32) -> Self {
        self.min_deadzone = min_deadzone;
        self.max_deadzone = max_deadzone;
        self
    }

    /// Check the range invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRange`] when `min >= max`, either bound
    /// is outside `0..=65535`, a deadzone is negative or not finite, or the
    /// deadzones add up to 100% or more.
    pub fn validate(&self, pedal: Pedal) -> Result<(), ValidationError> {
        let full = 0..=i32::from(AXIS_MAX);
        if !full.contains(&self.min) || !full.contains(&self.max) {
            return Err(ValidationError::invalid_range(
                pedal.as_str(),
                format!("bounds {}..{} outside 0..65535", self.min, self.max),
            ));
        }
        if self.min >= self.max {
            return Err(ValidationError::invalid_range(
                pedal.as_str(),
                format!("min {} >= max {}", self.min, self.max),
            ));
        }
        if !self.min_deadzone.is_finite()
            || !self.max_deadzone.is_finite()
            || self.min_deadzone < 0.0
            || self.max_deadzone < 0.0
        {
            return Err(ValidationError::invalid_range(
                pedal.as_str(),
                "deadzones must be finite and non-negative",
            ));
        }
        if self.min_deadzone + self.max_deadzone >= 100.0 {
            return Err(ValidationError::invalid_range(
                pedal.as_str(),
                format!(
                    "deadzones {}% + {}% reach 100%",
                    self.min_deadzone, self.max_deadzone
                ),
            ));
        }
        Ok(())
    }

    /// Return this range if valid, otherwise log a warning and fall back to the default.
    pub fn sanitized(self, pedal: Pedal) -> Self {
        match self.validate(pedal) {
            Ok(()) => self,
            Err(e) => {
                warn!(pedal = %pedal, error = %e, "Resetting invalid axis range to default");
                Self::default()
            }
        }
    }

    /// Map a raw reading into `[0, 100]` percent of travel.
    ///
    /// Readings outside the configured range clamp. A degenerate range
    /// (`max <= min`) falls back to the full 16-bit scale.
    pub fn normalize(&self, raw: u16) -> f64 {
        let raw = f64::from(raw);
        let pct = if self.max <= self.min {
            raw / f64::from(AXIS_MAX) * 100.0
        } else {
            let min = f64::from(self.min);
            let span = f64::from(self.max) - min;
            (raw - min) / span * 100.0
        };
        pct.clamp(0.0, 100.0)
    }
}

/// Axis ranges for every pedal, persisted as the axis range file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisRanges {
    pub throttle: AxisRange,
    pub brake: AxisRange,
    pub clutch: AxisRange,
    pub handbrake: AxisRange,
}

impl AxisRanges {
    pub fn get(&self, pedal: Pedal) -> &AxisRange {
        match pedal {
            Pedal::Throttle => &self.throttle,
            Pedal::Brake => &self.brake,
            Pedal::Clutch => &self.clutch,
            Pedal::Handbrake => &self.handbrake,
        }
    }

    pub fn get_mut(&mut self, pedal: Pedal) -> &mut AxisRange {
        match pedal {
            Pedal::Throttle => &mut self.throttle,
            Pedal::Brake => &mut self.brake,
            Pedal::Clutch => &mut self.clutch,
            Pedal::Handbrake => &mut self.handbrake,
        }
    }

    /// Replace every invalid range with the default; returns the pedals that were reset.
    pub fn sanitize(&mut self) -> Vec<Pedal> {
        let mut reset = Vec::new();
        for pedal in Pedal::ALL {
            let range = self.get_mut(pedal);
            if range.validate(pedal).is_err() {
                *range = range.sanitized(pedal);
                reset.push(pedal);
            }
        }
        reset
    }
}
