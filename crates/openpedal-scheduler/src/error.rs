//! Error types for the scheduler crate.

use std::fmt;

/// Scheduler error codes. `Copy` so they can be returned from the loop without allocating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RTError {
    /// The loop woke up more than one full period after its deadline
    TimingViolation = 1,
    /// Thread or process priority could not be applied
    RTSetupFailed {
        /// Raw OS error code (errno or HRESULT) when the OS reported one
        os_error: Option<i32>,
    } = 2,
}

impl fmt::Display for RTError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RTError::TimingViolation => write!(f, "Loop deadline missed"),
            RTError::RTSetupFailed { os_error: Some(code) } => {
                write!(f, "Failed to apply real-time setup (os error {code})")
            }
            RTError::RTSetupFailed { os_error: None } => write!(f, "Failed to apply real-time setup"),
        }
    }
}

impl std::error::Error for RTError {}

impl RTError {
    /// Setup failure carrying the error the OS reported.
    pub fn setup_failed(os_error: i32) -> Self {
        RTError::RTSetupFailed {
            os_error: Some(os_error),
        }
    }

    /// Setup failure built from the calling thread's last OS error.
    pub fn last_os_setup_failure() -> Self {
        RTError::RTSetupFailed {
            os_error: std::io::Error::last_os_error().raw_os_error(),
        }
    }
}

/// Result type for scheduler operations
pub type RTResult<T = ()> = Result<T, RTError>;
