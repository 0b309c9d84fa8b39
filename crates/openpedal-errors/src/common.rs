//! Top-level error type and severity classification.

use core::fmt;

use crate::{DeviceError, OutputError, StorageError, ValidationError};

/// Top-level error type wrapping every OpenPedal sub-error.
#[derive(Debug, thiserror::Error)]
pub enum PedalError {
    /// Physical pedal device errors
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Virtual output driver errors
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Calibration model validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration errors. These are the only errors meant for the operator.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PedalError {
    /// Get the error severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PedalError::Device(e) => e.severity(),
            PedalError::Output(e) => e.severity(),
            PedalError::Storage(e) => e.severity(),
            PedalError::Validation(e) => e.severity(),
            PedalError::Config(_) => ErrorSeverity::Critical,
        }
    }

    /// Check if the pipeline can keep running in a reduced mode after this error.
    pub fn is_recoverable(&self) -> bool {
        self.severity() < ErrorSeverity::Critical
    }

    /// Whether this error must be reported to the operator instead of being absorbed.
    ///
    /// Only configuration-level problems qualify: an explicit configuration
    /// error, or a storage I/O error caused by missing permissions.
    pub fn surfaces_to_operator(&self) -> bool {
        match self {
            PedalError::Config(_) => true,
            PedalError::Storage(StorageError::Io(e)) => {
                e.kind() == std::io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }

    /// Create a configuration error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        PedalError::Config(msg.into())
    }
}

impl From<std::io::Error> for PedalError {
    fn from(e: std::io::Error) -> Self {
        PedalError::Storage(StorageError::Io(e))
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, the pipeline degraded but keeps running
    Warning = 1,
    /// Error, an operation failed
    Error = 2,
    /// Critical, cannot continue without operator action
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity_ordering() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Error);
        assert!(ErrorSeverity::Error > ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning > ErrorSeverity::Info);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
    }

    #[test]
    fn test_hot_loop_errors_are_recoverable() {
        let errors: Vec<PedalError> = vec![
            DeviceError::unavailable("pedals").into(),
            DeviceError::TransientRead { axis: 2 }.into(),
            OutputError::AcquireFailed { attempted: 4 }.into(),
            ValidationError::invalid_range("brake", "min >= max").into(),
            StorageError::persistence("disk full").into(),
        ];

        for err in errors {
            assert!(err.is_recoverable(), "{err} should be recoverable");
            assert!(!err.surfaces_to_operator(), "{err} should be absorbed");
        }
    }

    #[test]
    fn test_config_errors_surface() {
        let err = PedalError::config("config directory not writable");
        assert!(!err.is_recoverable());
        assert!(err.surfaces_to_operator());
        assert!(err.to_string().contains("not writable"));
    }

    #[test]
    fn test_permission_denied_surfaces() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: PedalError = io.into();
        assert!(err.surfaces_to_operator());

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PedalError = io.into();
        assert!(!err.surfaces_to_operator());
    }
}
