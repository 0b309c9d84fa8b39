//! Piecewise-linear response curves.

use serde::{Deserialize, Serialize};

/// One control point of a response curve, in percent.
///
/// Serialized as a two-element array `[input_pct, output_pct]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct CurvePoint {
    pub input: f64,
    pub output: f64,
}

impl CurvePoint {
    pub fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }

    fn clamped(self) -> Self {
        Self {
            input: clamp_pct(self.input),
            output: clamp_pct(self.output),
        }
    }
}

impl From<(f64, f64)> for CurvePoint {
    fn from((input, output): (f64, f64)) -> Self {
        Self { input, output }
    }
}

impl From<CurvePoint> for (f64, f64) {
    fn from(point: CurvePoint) -> Self {
        (point.input, point.output)
    }
}

fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn default_label() -> String {
    CalibrationCurve::LINEAR.to_string()
}

/// Ordered control points plus a curve-kind label.
///
/// On disk this is `{"points": [[in, out], ...], "curve": "Racing"}`. Preset
/// files written by older tools call the label `curve_type`; both are accepted.
///
/// # Examples
///
/// ```
/// use openpedal_calibration::CalibrationCurve;
///
/// let curve = CalibrationCurve::from_pairs("Custom", &[(100.0, 100.0), (0.0, 0.0), (50.0, 80.0)]);
/// assert_eq!(curve.points()[1].input, 50.0);
/// assert_eq!(curve.interpolate(25.0), Some(40.0));
/// assert_eq!(CalibrationCurve::linear().interpolate(25.0), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    points: Vec<CurvePoint>,
    #[serde(default = "default_label", alias = "curve_type")]
    curve: String,
}

impl Default for CalibrationCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl CalibrationCurve {
    pub const LINEAR: &'static str = "Linear";

    /// Identity curve with no control points.
    pub fn linear() -> Self {
        Self {
            points: Vec::new(),
            curve: Self::LINEAR.to_string(),
        }
    }

    /// Build a curve, clamping coordinates to `[0, 100]` and sorting by input.
    pub fn new(label: impl Into<String>, points: Vec<CurvePoint>) -> Self {
        let mut curve = Self {
            points,
            curve: label.into(),
        };
        curve.normalize();
        curve
    }

    pub fn from_pairs(label: impl Into<String>, pairs: &[(f64, f64)]) -> Self {
        Self::new(label, pairs.iter().copied().map(CurvePoint::from).collect())
    }

    /// Re-establish the sorted, clamped invariant after deserialization.
    pub fn normalize(&mut self) {
        for point in &mut self.points {
            *point = point.clamped();
        }
        self.points.sort_by(|a, b| a.input.total_cmp(&b.input));
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn label(&self) -> &str {
        &self.curve
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.curve = label.into();
    }

    pub fn is_identity(&self) -> bool {
        self.points.is_empty()
    }

    /// Evaluate the curve at `input` percent.
    ///
    /// Returns `None` for a curve without control points. Inputs below the
    /// first or above the last point take that point's output.
    pub fn interpolate(&self, input: f64) -> Option<f64> {
        let first = self.points.first()?;
        if input <= first.input {
            return Some(first.output);
        }

        for pair in self.points.windows(2) {
            let [lo, hi] = pair else {
                continue;
            };
            if input <= hi.input {
                let span = hi.input - lo.input;
                if span <= f64::EPSILON {
                    return Some(hi.output);
                }
                let t = (input - lo.input) / span;
                return Some(lo.output + t * (hi.output - lo.output));
            }
        }

        self.points.last().map(|last| last.output)
    }
}
