//! Virtual output driver errors.

use crate::common::ErrorSeverity;

/// Errors raised by the virtual joystick driver and the output sink.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OutputError {
    /// No output slot could be acquired after trying every identifier
    #[error("No virtual output slot could be acquired ({attempted} identifiers tried)")]
    AcquireFailed {
        /// Number of identifiers attempted
        attempted: usize,
    },

    /// Slot is owned by another process
    #[error("Virtual output slot {0} is busy")]
    SlotBusy(u32),

    /// Driver not installed or slot not configured
    #[error("Virtual output slot {0} is missing")]
    DriverMissing(u32),

    /// Writing an axis value failed
    #[error("Failed to write usage {usage:#04x} on slot {slot}: {reason}")]
    WriteFailed {
        /// Slot identifier
        slot: u32,
        /// HID usage of the axis
        usage: u32,
        /// Driver message
        reason: String,
    },
}

impl OutputError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            OutputError::AcquireFailed { .. } => ErrorSeverity::Warning,
            OutputError::SlotBusy(_) => ErrorSeverity::Info,
            OutputError::DriverMissing(_) => ErrorSeverity::Info,
            OutputError::WriteFailed { .. } => ErrorSeverity::Warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_failed_display() {
        let err = OutputError::WriteFailed {
            slot: 1,
            usage: 0x30,
            reason: "device gone".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to write usage 0x30 on slot 1: device gone"
        );
    }
}
