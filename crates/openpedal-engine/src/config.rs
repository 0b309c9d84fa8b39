use std::time::Duration;

use openpedal_scheduler::RTSetup;

/// Input loop settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Loop rate in Hz
    pub tick_rate_hz: u32,
    /// Observer delivery rate in Hz
    pub observer_hz: u32,
    /// Priority setup applied on the loop thread
    pub rt_setup: RTSetup,
    /// Raise the whole process to a high priority class on start
    pub raise_process_priority: bool,
    /// Cycles slower than this count as slow frames
    pub slow_frame_threshold: Duration,
    /// Cycles between published timing summaries
    pub stats_interval_cycles: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 1000,
            observer_hz: 60,
            rt_setup: RTSetup::default(),
            raise_process_priority: true,
            slow_frame_threshold: Duration::from_millis(2),
            stats_interval_cycles: 10_000,
        }
    }
}

impl EngineConfig {
    /// Default rates without any priority changes.
    pub fn unprivileged() -> Self {
        Self {
            rt_setup: RTSetup::minimal(),
            raise_process_priority: false,
            ..Self::default()
        }
    }

    pub fn observer_period(&self) -> Duration {
        let hz = u64::from(self.observer_hz.max(1));
        Duration::from_nanos(1_000_000_000 / hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observer_period() {
        let config = EngineConfig {
            observer_hz: 50,
            ..EngineConfig::default()
        };
        assert_eq!(config.observer_period(), Duration::from_millis(20));

        let zero = EngineConfig {
            observer_hz: 0,
            ..EngineConfig::default()
        };
        assert_eq!(zero.observer_period(), Duration::from_secs(1));
    }
}
