//! Real-time setup for the input loop thread.

/// Real-time parameters applied to the thread that runs the input loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RTSetup {
    /// Raise the loop thread to the highest available priority.
    ///
    /// On Windows: `THREAD_PRIORITY_TIME_CRITICAL`.
    /// On Linux: `SCHED_FIFO` with priority 80 (needs `CAP_SYS_NICE`).
    pub high_priority: bool,

    /// Lock current and future pages into memory (Linux only).
    pub lock_memory: bool,
}

impl Default for RTSetup {
    fn default() -> Self {
        Self {
            high_priority: true,
            lock_memory: false,
        }
    }
}

impl RTSetup {
    pub fn new() -> Self {
        Self::default()
    }

    /// No priority changes. Used for tests and `disable_realtime`.
    pub fn minimal() -> Self {
        Self {
            high_priority: false,
            lock_memory: false,
        }
    }

    pub fn with_high_priority(mut self, enabled: bool) -> Self {
        self.high_priority = enabled;
        self
    }

    pub fn with_lock_memory(mut self, enabled: bool) -> Self {
        self.lock_memory = enabled;
        self
    }

    pub fn has_rt_features(&self) -> bool {
        self.high_priority || self.lock_memory
    }
}
