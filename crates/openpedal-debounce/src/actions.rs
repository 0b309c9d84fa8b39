//! Standard debounced actions.

use std::time::Duration;

/// Name and timing of a debounced action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: &'static str,
    /// Quiet period after the last trigger
    pub delay: Duration,
    /// Upper bound from the first trigger of a burst
    pub max_delay: Duration,
}

impl ActionSpec {
    pub const fn new(name: &'static str, delay: Duration, max_delay: Duration) -> Self {
        Self {
            name,
            delay,
            max_delay,
        }
    }
}

pub const SAVE_CALIBRATION: ActionSpec =
    ActionSpec::new("save_calibration", Duration::from_millis(500), Duration::from_secs(2));

pub const SAVE_AXIS_RANGES: ActionSpec =
    ActionSpec::new("save_axis_ranges", Duration::from_millis(500), Duration::from_secs(2));

pub const SAVE_AXIS_MAPPINGS: ActionSpec =
    ActionSpec::new("save_axis_mappings", Duration::from_millis(500), Duration::from_secs(2));

pub const REFRESH_CURVES: ActionSpec =
    ActionSpec::new("refresh_curves", Duration::from_secs(1), Duration::from_secs(3));

pub const CLOUD_PUSH: ActionSpec =
    ActionSpec::new("cloud_push", Duration::from_secs(60), Duration::from_secs(120));

/// Every standard action.
pub const ALL: [ActionSpec; 5] = [
    SAVE_CALIBRATION,
    SAVE_AXIS_RANGES,
    SAVE_AXIS_MAPPINGS,
    REFRESH_CURVES,
    CLOUD_PUSH,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_actions_are_bounded() {
        for spec in ALL {
            assert!(spec.delay <= spec.max_delay, "{} delay exceeds its cap", spec.name);
        }
    }

    #[test]
    fn test_standard_action_names_unique() {
        for (i, a) in ALL.iter().enumerate() {
            for b in ALL.iter().skip(i + 1) {
                assert_ne!(a.name, b.name);
            }
        }
    }
}
