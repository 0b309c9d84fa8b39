//! Cloud-sync collaborator.
//!
//! The remote store speaks the calibration file schema keyed by pedal name.
//! Local data always wins: the cloud is only consulted when no local
//! calibration file exists.

use std::collections::BTreeMap;

use async_trait::async_trait;
use openpedal_calibration::{CalibrationCurve, Pedal};
use tracing::{info, warn};

use crate::calibration::CalibrationFiles;

#[async_trait]
pub trait CloudSync: Send + Sync {
    /// Remote curve for `pedal`, if any.
    async fn pull(&self, pedal: Pedal) -> anyhow::Result<Option<CalibrationCurve>>;

    async fn push(&self, pedal: Pedal, curve: &CalibrationCurve) -> anyhow::Result<()>;
}

/// Sync disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCloudSync;

#[async_trait]
impl CloudSync for NoopCloudSync {
    async fn pull(&self, _pedal: Pedal) -> anyhow::Result<Option<CalibrationCurve>> {
        Ok(None)
    }

    async fn push(&self, _pedal: Pedal, _curve: &CalibrationCurve) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Pull the calibration from the cloud when there is none locally, and write it locally.
///
/// Returns the number of pedals pulled. Cloud errors are logged and ignored.
///
/// # Errors
///
/// Fails only when the pulled calibration cannot be written locally.
pub async fn pull_missing_calibration(files: &CalibrationFiles, cloud: &dyn CloudSync) -> anyhow::Result<usize> {
    if files.has_calibration().await {
        return Ok(0);
    }

    let mut pulled = BTreeMap::new();
    for pedal in Pedal::ALL {
        match cloud.pull(pedal).await {
            Ok(Some(curve)) => {
                pulled.insert(pedal, curve);
            }
            Ok(None) => {}
            Err(e) => warn!(pedal = %pedal, error = %format!("{e:#}"), "Cloud pull failed"),
        }
    }

    if pulled.is_empty() {
        return Ok(0);
    }
    files.save_calibration(&pulled).await?;
    info!(pedals = pulled.len(), "Pulled calibration from cloud");
    Ok(pulled.len())
}

/// Push every pedal's curve; failures are logged and ignored.
pub async fn push_calibration(cloud: &dyn CloudSync, curves: &BTreeMap<Pedal, CalibrationCurve>) {
    for (pedal, curve) in curves {
        if let Err(e) = cloud.push(*pedal, curve).await {
            warn!(pedal = %pedal, error = %format!("{e:#}"), "Cloud push failed");
        }
    }
}
