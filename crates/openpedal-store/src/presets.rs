//! Built-in curve presets.

use openpedal_calibration::{CalibrationCurve, Pedal};

pub struct DefaultPreset {
    pub pedal: Pedal,
    pub name: &'static str,
    pub points: &'static [(f64, f64)],
}

impl DefaultPreset {
    pub fn curve(&self) -> CalibrationCurve {
        CalibrationCurve::from_pairs(self.name, self.points)
    }
}

const PRESETS: &[DefaultPreset] = &[
    DefaultPreset {
        pedal: Pedal::Throttle,
        name: "Racing",
        points: &[(0.0, 0.0), (25.0, 10.0), (50.0, 30.0), (75.0, 60.0), (100.0, 100.0)],
    },
    DefaultPreset {
        pedal: Pedal::Throttle,
        name: "Smooth",
        points: &[(0.0, 0.0), (25.0, 35.0), (50.0, 65.0), (75.0, 85.0), (100.0, 100.0)],
    },
    DefaultPreset {
        pedal: Pedal::Throttle,
        name: "Aggressive",
        points: &[(0.0, 0.0), (25.0, 5.0), (50.0, 15.0), (75.0, 40.0), (100.0, 100.0)],
    },
    DefaultPreset {
        pedal: Pedal::Throttle,
        name: "Precision Control",
        points: &[(0.0, 0.0), (20.0, 5.0), (40.0, 15.0), (60.0, 35.0), (80.0, 70.0), (100.0, 100.0)],
    },
    DefaultPreset {
        pedal: Pedal::Throttle,
        name: "Rain Mode",
        points: &[(0.0, 0.0), (25.0, 8.0), (50.0, 20.0), (75.0, 35.0), (90.0, 60.0), (100.0, 80.0)],
    },
    DefaultPreset {
        pedal: Pedal::Brake,
        name: "Hard Braking",
        points: &[(0.0, 0.0), (25.0, 40.0), (50.0, 70.0), (75.0, 90.0), (100.0, 100.0)],
    },
    DefaultPreset {
        pedal: Pedal::Brake,
        name: "Progressive",
        points: &[(0.0, 0.0), (25.0, 15.0), (50.0, 40.0), (75.0, 75.0), (100.0, 100.0)],
    },
    DefaultPreset {
        pedal: Pedal::Brake,
        name: "Trail Braking",
        points: &[
            (0.0, 0.0),
            (15.0, 5.0),
            (30.0, 20.0),
            (50.0, 45.0),
            (70.0, 75.0),
            (85.0, 95.0),
            (100.0, 100.0),
        ],
    },
    DefaultPreset {
        pedal: Pedal::Brake,
        name: "Wet Weather",
        points: &[(0.0, 0.0), (20.0, 5.0), (40.0, 15.0), (60.0, 30.0), (80.0, 60.0), (100.0, 85.0)],
    },
    DefaultPreset {
        pedal: Pedal::Clutch,
        name: "Quick Engage",
        points: &[(0.0, 0.0), (25.0, 60.0), (50.0, 85.0), (75.0, 95.0), (100.0, 100.0)],
    },
    DefaultPreset {
        pedal: Pedal::Clutch,
        name: "Gradual",
        points: &[(0.0, 0.0), (25.0, 20.0), (50.0, 50.0), (75.0, 80.0), (100.0, 100.0)],
    },
    DefaultPreset {
        pedal: Pedal::Clutch,
        name: "Bite Point Focus",
        points: &[
            (0.0, 0.0),
            (30.0, 20.0),
            (45.0, 40.0),
            (50.0, 70.0),
            (55.0, 90.0),
            (60.0, 95.0),
            (100.0, 100.0),
        ],
    },
    DefaultPreset {
        pedal: Pedal::Clutch,
        name: "Smooth Launch",
        points: &[
            (0.0, 0.0),
            (15.0, 5.0),
            (30.0, 20.0),
            (45.0, 45.0),
            (60.0, 80.0),
            (75.0, 95.0),
            (100.0, 100.0),
        ],
    },
    DefaultPreset {
        pedal: Pedal::Handbrake,
        name: "Linear Pull",
        points: &[(0.0, 0.0), (100.0, 100.0)],
    },
    DefaultPreset {
        pedal: Pedal::Handbrake,
        name: "Drift Snap",
        points: &[(0.0, 0.0), (20.0, 50.0), (40.0, 85.0), (60.0, 100.0), (100.0, 100.0)],
    },
];

/// Presets created on first run.
pub fn default_presets() -> &'static [DefaultPreset] {
    PRESETS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pedal_has_presets() {
        for pedal in Pedal::ALL {
            assert!(default_presets().iter().any(|p| p.pedal == pedal), "{pedal} has no preset");
        }
    }

    #[test]
    fn test_presets_are_monotonic() {
        for preset in default_presets() {
            let curve = preset.curve();
            assert_eq!(curve.label(), preset.name);
            for pair in curve.points().windows(2) {
                if let [a, b] = pair {
                    assert!(a.input < b.input && a.output <= b.output, "{} is not monotonic", preset.name);
                }
            }
        }
    }
}
