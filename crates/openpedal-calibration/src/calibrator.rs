//! Range calibration wizard

use crate::{AxisRange, CalibrationError, CalibrationResult, Pedal};

/// Captures the travel of one pedal while the user presses it through its range.
///
/// Only min and max are kept, so sampling at the input loop rate costs nothing.
#[derive(Debug, Clone)]
pub struct RangeCalibrator {
    pedal: Pedal,
    min: Option<u16>,
    max: Option<u16>,
    samples: u64,
}

impl RangeCalibrator {
    pub fn begin(pedal: Pedal) -> Self {
        Self {
            pedal,
            min: None,
            max: None,
            samples: 0,
        }
    }

    pub fn pedal(&self) -> Pedal {
        self.pedal
    }

    pub fn sample(&mut self, raw: u16) {
        self.min = Some(self.min.map_or(raw, |m| m.min(raw)));
        self.max = Some(self.max.map_or(raw, |m| m.max(raw)));
        self.samples = self.samples.saturating_add(1);
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Observed `(min, max)` so far.
    pub fn observed(&self) -> Option<(u16, u16)> {
        Some((self.min?, self.max?))
    }

    /// Produce the captured range, keeping the deadzones of `current`.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::NotComplete`] if fewer than two distinct
    /// values were observed.
    pub fn finish(&self, current: &AxisRange) -> CalibrationResult<AxisRange> {
        match self.observed() {
            Some((min, max)) if min < max => {
                let range = AxisRange {
                    min: i32::from(min),
                    max: i32::from(max),
                    ..*current
                };
                range.validate(self.pedal)?;
                Ok(range)
            }
            _ => Err(CalibrationError::NotComplete(format!(
                "{} needs at least two distinct samples",
                self.pedal
            ))),
        }
    }

    pub fn reset(&mut self) {
        self.min = None;
        self.max = None;
        self.samples = 0;
    }
}
