//! Named curve presets, one JSON file each under `curves/<pedal>/`.

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Context;
use openpedal_calibration::{CalibrationCurve, CurvePoint, Pedal};
use openpedal_errors::StorageError;
use serde::{Deserialize, Serialize};
use tokio::fs as async_fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{CacheConfig, CacheStats, CurveCache, CurveFileMeta};
use crate::clock::{Clock, SystemClock};
use crate::fs::{remove_if_exists, write_json};
use crate::layout::DataLayout;
use crate::presets::default_presets;

/// Preset file as found on disk; the label may be missing or spelled `curve_type`.
#[derive(Debug, Deserialize)]
struct CurveFileRaw {
    points: Vec<CurvePoint>,
    #[serde(default, alias = "curve_type")]
    curve: Option<String>,
}

#[derive(Debug, Serialize)]
struct CurveFileOut<'a> {
    points: &'a [CurvePoint],
    curve: &'a str,
}

/// Read and parse one preset file. `stem` names the curve when the file has no label.
pub(crate) async fn parse_curve_file(path: &Path, stem: &str) -> Result<CalibrationCurve, StorageError> {
    let bytes = async_fs::read(path)
        .await
        .map_err(|e| StorageError::corrupt(path, e.to_string()))?;
    let raw: CurveFileRaw =
        serde_json::from_slice(&bytes).map_err(|e| StorageError::corrupt(path, e.to_string()))?;
    if raw.points.iter().any(|p| !p.input.is_finite() || !p.output.is_finite()) {
        return Err(StorageError::corrupt(path, "non-finite control point"));
    }
    let label = raw.curve.unwrap_or_else(|| stem.to_owned());
    Ok(CalibrationCurve::new(label, raw.points))
}

/// Reject names that would escape the pedal's curve directory.
///
/// # Errors
///
/// Returns [`StorageError::InvalidName`] for empty names, names containing a
/// path separator or `..`, and names that start with a dot.
pub fn validate_curve_name(name: &str) -> Result<(), StorageError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed != name
        || name.contains(['/', '\\', '\0'])
        || name.contains("..")
        || name.starts_with('.');
    if invalid {
        return Err(StorageError::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// Curve preset storage with a freshness cache in front of directory scans.
pub struct CurveStore {
    layout: DataLayout,
    cache: Mutex<CurveCache>,
}

impl CurveStore {
    /// Open the store under `layout`, reloading the persisted cache.
    ///
    /// `started_at` is the process start time used for the startup grace period.
    pub async fn open(
        layout: DataLayout,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
        started_at: SystemTime,
    ) -> anyhow::Result<Self> {
        async_fs::create_dir_all(layout.curves_dir())
            .await
            .with_context(|| format!("Failed to create curves directory: {:?}", layout.curves_dir()))?;
        let cache = CurveCache::load(layout.curve_cache_file(), config, clock, started_at).await;
        Ok(Self {
            layout,
            cache: Mutex::new(cache),
        })
    }

    /// Store with default cache settings and the system clock, starting now.
    pub async fn open_default(layout: DataLayout) -> anyhow::Result<Self> {
        Self::open(layout, CacheConfig::default(), Arc::new(SystemClock), SystemTime::now()).await
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Names of the presets stored for `pedal`, sorted.
    pub async fn list_curves(&self, pedal: Pedal) -> Vec<String> {
        let dir = self.layout.pedal_curves_dir(pedal);
        let mut names = self.cache.lock().await.list(pedal, &dir).await;
        names.sort();
        names
    }

    /// Load a preset; `Ok(None)` when it does not exist or cannot be parsed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidName`] for names that are not plain file names.
    pub async fn load(&self, pedal: Pedal, name: &str) -> anyhow::Result<Option<CalibrationCurve>> {
        validate_curve_name(name)?;
        let path = self.layout.curve_file(pedal, name);
        if !async_fs::try_exists(&path).await.unwrap_or(false) {
            debug!(pedal = %pedal, name, "Curve not found");
            return Ok(None);
        }
        match parse_curve_file(&path, name).await {
            Ok(curve) => Ok(Some(curve)),
            Err(e) => {
                warn!(pedal = %pedal, name, error = %e, "Ignoring corrupt curve file");
                Ok(None)
            }
        }
    }

    /// Write a preset atomically and update the cache in place.
    ///
    /// # Errors
    ///
    /// Fails on an invalid name or when the file cannot be written.
    pub async fn save(&self, pedal: Pedal, name: &str, curve: &CalibrationCurve) -> anyhow::Result<()> {
        validate_curve_name(name)?;
        let path = self.layout.curve_file(pedal, name);
        let file = CurveFileOut {
            points: curve.points(),
            curve: curve.label(),
        };
        write_json(&path, &file).await?;

        match CurveFileMeta::read(&path).await {
            Ok(meta) => self.cache.lock().await.record(pedal, name, meta).await,
            Err(e) => {
                debug!(path = ?path, error = %e, "Cannot stat saved curve, invalidating cache");
                self.cache.lock().await.invalidate_pedal(pedal).await;
            }
        }
        info!(pedal = %pedal, name, "Saved curve");
        Ok(())
    }

    /// Delete a preset. Deleting a missing preset succeeds.
    ///
    /// # Errors
    ///
    /// Fails on an invalid name or when the file exists but cannot be removed.
    pub async fn delete(&self, pedal: Pedal, name: &str) -> anyhow::Result<()> {
        validate_curve_name(name)?;
        let path = self.layout.curve_file(pedal, name);
        let removed = remove_if_exists(&path).await?;
        self.cache.lock().await.forget(pedal, name).await;
        if removed {
            info!(pedal = %pedal, name, "Deleted curve");
        }
        Ok(())
    }

    /// Create any built-in preset that is missing. Existing files are never overwritten.
    ///
    /// Returns the number of presets written.
    ///
    /// # Errors
    ///
    /// Fails when a preset file cannot be written.
    pub async fn ensure_default_presets(&self) -> anyhow::Result<usize> {
        let mut created = 0usize;
        for preset in default_presets() {
            let path = self.layout.curve_file(preset.pedal, preset.name);
            if async_fs::try_exists(&path).await.unwrap_or(false) {
                continue;
            }
            self.save(preset.pedal, preset.name, &preset.curve()).await?;
            created = created.saturating_add(1);
        }
        if created > 0 {
            info!(created, "Created default curve presets");
        }
        Ok(created)
    }

    pub async fn invalidate_pedal(&self, pedal: Pedal) {
        self.cache.lock().await.invalidate_pedal(pedal).await;
    }

    pub async fn invalidate_all(&self) {
        self.cache.lock().await.invalidate_all().await;
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_names() {
        assert!(validate_curve_name("Trail Braking").is_ok());
        assert!(validate_curve_name("F1-Style_2").is_ok());
        for bad in ["", " ", "../escape", "a/b", "a\\b", "..", ".hidden", " padded"] {
            assert!(
                matches!(validate_curve_name(bad), Err(StorageError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
