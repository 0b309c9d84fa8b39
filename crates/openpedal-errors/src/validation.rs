//! Calibration model validation errors.

use crate::common::ErrorSeverity;

/// Validation failures for axis ranges and axis mappings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Axis range is unusable (min >= max, or deadzones sum to 100% or more)
    #[error("Invalid range for {pedal}: {reason}")]
    InvalidRange {
        /// Pedal name
        pedal: String,
        /// What was wrong
        reason: String,
    },

    /// Axis index does not exist on the device
    #[error("Invalid axis {axis} for {pedal}: device has {axis_count} axes")]
    InvalidMapping {
        /// Pedal name
        pedal: String,
        /// Requested axis index
        axis: i32,
        /// Axes available on the device
        axis_count: usize,
    },
}

impl ValidationError {
    /// Create an invalid range error.
    pub fn invalid_range(pedal: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidRange {
            pedal: pedal.into(),
            reason: reason.into(),
        }
    }

    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Warning
    }
}
