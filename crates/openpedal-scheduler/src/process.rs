//! Process-wide priority class.

#![expect(unsafe_code, reason = "OS priority calls")]

use crate::error::{RTError, RTResult};

/// Raises the host process to a high, non-realtime priority class.
///
/// The input loop thread gets its own elevated priority through
/// [`crate::RTSetup`]; this covers the rest of the process (observer,
/// debounced saves) so it is not starved by the game.
pub struct ProcessPriority;

impl ProcessPriority {
    /// Unix niceness requested for the process.
    pub const UNIX_NICE: i32 = -10;

    /// Best-effort: callers log the error and continue.
    ///
    /// # Errors
    ///
    /// Returns [`RTError::RTSetupFailed`] with the OS error if the OS refused the change.
    #[cfg(windows)]
    pub fn raise() -> RTResult {
        use windows::Win32::System::Threading::{GetCurrentProcess, HIGH_PRIORITY_CLASS, SetPriorityClass};

        // SAFETY: GetCurrentProcess returns a pseudo-handle that never needs closing.
        unsafe { SetPriorityClass(GetCurrentProcess(), HIGH_PRIORITY_CLASS) }
            .map_err(|e| RTError::setup_failed(e.code().0))
    }

    /// Best-effort: callers log the error and continue.
    ///
    /// # Errors
    ///
    /// Returns [`RTError::RTSetupFailed`] with the OS error if the OS refused the change.
    #[cfg(unix)]
    pub fn raise() -> RTResult {
        // SAFETY: setpriority only reads its integer arguments; who = 0 is the calling process.
        let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, Self::UNIX_NICE) };
        if rc == 0 {
            Ok(())
        } else {
            Err(RTError::last_os_setup_failure())
        }
    }

    /// Best-effort: callers log the error and continue.
    ///
    /// # Errors
    ///
    /// Never fails on this platform.
    #[cfg(not(any(windows, unix)))]
    pub fn raise() -> RTResult {
        Ok(())
    }
}
