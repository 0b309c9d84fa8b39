//! Physical pedal device errors.

use crate::common::ErrorSeverity;

/// Errors raised by the physical pedal device and its poller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeviceError {
    /// Pedal device not found or could not be opened
    #[error("Pedal device unavailable: {0}")]
    Unavailable(String),

    /// A single axis read glitched
    #[error("Transient read error on axis {axis}")]
    TransientRead {
        /// Physical axis index
        axis: usize,
    },

    /// Device went away while in use
    #[error("Pedal device disconnected: {0}")]
    Disconnected(String),

    /// Low-level HID failure
    #[error("HID error: {0}")]
    Hid(String),
}

impl DeviceError {
    /// Create an unavailable error.
    pub fn unavailable(device: impl Into<String>) -> Self {
        DeviceError::Unavailable(device.into())
    }

    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DeviceError::Unavailable(_) => ErrorSeverity::Warning,
            DeviceError::TransientRead { .. } => ErrorSeverity::Info,
            DeviceError::Disconnected(_) => ErrorSeverity::Warning,
            DeviceError::Hid(_) => ErrorSeverity::Error,
        }
    }

    /// Whether this error only affects the current sample.
    pub fn is_transient(&self) -> bool {
        matches!(self, DeviceError::TransientRead { .. })
    }
}
