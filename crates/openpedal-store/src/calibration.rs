//! Calibration, axis range, and axis mapping files.
//!
//! Each file holds one entry per pedal. Entries are parsed independently so
//! one bad pedal does not discard the others; a bad or missing entry falls
//! back to its default.

use std::collections::BTreeMap;

use openpedal_calibration::{AxisMapping, AxisRange, AxisRanges, CalibrationCurve, CalibrationModel, Pedal};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::fs::{read_json, write_json};
use crate::layout::DataLayout;

/// Reads and writes the per-pedal calibration files.
#[derive(Debug, Clone)]
pub struct CalibrationFiles {
    layout: DataLayout,
}

/// Parse the entries of a per-pedal JSON object, skipping unknown keys and bad entries.
fn parse_pedal_entries<T: DeserializeOwned>(file: &str, object: BTreeMap<String, Value>) -> BTreeMap<Pedal, T> {
    let mut parsed = BTreeMap::new();
    for (key, value) in object {
        let Ok(pedal) = key.parse::<Pedal>() else {
            debug!(file, key = %key, "Ignoring unknown pedal entry");
            continue;
        };
        match serde_json::from_value::<T>(value) {
            Ok(entry) => {
                parsed.insert(pedal, entry);
            }
            Err(e) => warn!(file, pedal = %pedal, error = %e, "Ignoring invalid pedal entry"),
        }
    }
    parsed
}

impl CalibrationFiles {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    async fn read_object(&self, path: &std::path::Path) -> anyhow::Result<Option<BTreeMap<String, Value>>> {
        match read_json::<BTreeMap<String, Value>>(path).await {
            Ok(object) => Ok(object),
            Err(e) if e.downcast_ref::<serde_json::Error>().is_some() => {
                warn!(path = ?path, error = %format!("{e:#}"), "Ignoring corrupt calibration file");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Whether a calibration file exists locally.
    pub async fn has_calibration(&self) -> bool {
        tokio::fs::try_exists(self.layout.calibration_file()).await.unwrap_or(false)
    }

    /// Curves in use per pedal. Pedals without an entry are absent from the map.
    ///
    /// # Errors
    ///
    /// Fails only when the file exists but cannot be read.
    pub async fn load_calibration(&self) -> anyhow::Result<BTreeMap<Pedal, CalibrationCurve>> {
        let path = self.layout.calibration_file();
        let Some(object) = self.read_object(&path).await? else {
            return Ok(BTreeMap::new());
        };
        let mut curves: BTreeMap<Pedal, CalibrationCurve> = parse_pedal_entries("calibration", object);
        for curve in curves.values_mut() {
            curve.normalize();
        }
        Ok(curves)
    }

    /// # Errors
    ///
    /// Fails when the file cannot be written.
    pub async fn save_calibration(&self, curves: &BTreeMap<Pedal, CalibrationCurve>) -> anyhow::Result<()> {
        write_json(&self.layout.calibration_file(), curves).await?;
        debug!(pedals = curves.len(), "Saved calibration");
        Ok(())
    }

    /// Axis ranges; invalid entries are reset to the default with a warning.
    ///
    /// # Errors
    ///
    /// Fails only when the file exists but cannot be read.
    pub async fn load_axis_ranges(&self) -> anyhow::Result<AxisRanges> {
        let path = self.layout.axis_ranges_file();
        let mut ranges = AxisRanges::default();
        if let Some(object) = self.read_object(&path).await? {
            for (pedal, range) in parse_pedal_entries::<AxisRange>("axis_ranges", object) {
                *ranges.get_mut(pedal) = range;
            }
        }
        let reset = ranges.sanitize();
        if !reset.is_empty() {
            warn!(pedals = ?reset, "Reset invalid axis ranges to defaults");
        }
        Ok(ranges)
    }

    /// # Errors
    ///
    /// Fails when the file cannot be written.
    pub async fn save_axis_ranges(&self, ranges: &AxisRanges) -> anyhow::Result<()> {
        write_json(&self.layout.axis_ranges_file(), ranges).await?;
        debug!("Saved axis ranges");
        Ok(())
    }

    /// # Errors
    ///
    /// Fails only when the file exists but cannot be read.
    pub async fn load_axis_mappings(&self) -> anyhow::Result<AxisMapping> {
        let path = self.layout.axis_mappings_file();
        let mut mapping = AxisMapping::default();
        if let Some(object) = self.read_object(&path).await? {
            for (pedal, axis) in parse_pedal_entries::<i32>("axis_mappings", object) {
                if let Err(e) = mapping.update(pedal, axis, usize::MAX) {
                    warn!(pedal = %pedal, error = %e, "Ignoring invalid axis mapping");
                }
            }
        }
        Ok(mapping)
    }

    /// # Errors
    ///
    /// Fails when the file cannot be written.
    pub async fn save_axis_mappings(&self, mapping: &AxisMapping) -> anyhow::Result<()> {
        write_json(&self.layout.axis_mappings_file(), mapping).await?;
        debug!(?mapping, "Saved axis mappings");
        Ok(())
    }

    /// Assemble the calibration model from the three files.
    ///
    /// # Errors
    ///
    /// Fails only when a file exists but cannot be read.
    pub async fn load_model(&self) -> anyhow::Result<CalibrationModel> {
        let mapping = self.load_axis_mappings().await?;
        let ranges = self.load_axis_ranges().await?;
        let mut curves = self.load_calibration().await?;
        let model = CalibrationModel::from_parts(mapping, ranges, |pedal| {
            curves.remove(&pedal).unwrap_or_default()
        });
        info!(root = ?self.layout.root(), "Loaded calibration model");
        Ok(model)
    }

    /// Write all three files from `model`.
    ///
    /// # Errors
    ///
    /// Fails when any file cannot be written.
    pub async fn save_model(&self, model: &CalibrationModel) -> anyhow::Result<()> {
        self.save_calibration(&curves_of(model)).await?;
        self.save_axis_ranges(&model.ranges()).await?;
        self.save_axis_mappings(&model.mapping).await
    }
}

/// Per-pedal curves of a model, in the calibration file shape.
pub fn curves_of(model: &CalibrationModel) -> BTreeMap<Pedal, CalibrationCurve> {
    Pedal::ALL
        .into_iter()
        .map(|pedal| (pedal, model.curve(pedal).clone()))
        .collect()
}
