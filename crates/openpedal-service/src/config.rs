//! Service configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use openpedal_engine::EngineConfig;
use openpedal_errors::PedalError;
use openpedal_output::OutputConfig;
use openpedal_scheduler::RTSetup;
use openpedal_store::{CacheConfig, DataLayout, default_data_dir};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const MAX_TICK_RATE_HZ: u32 = 10_000;

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Data directory; `~/.openpedal` when unset
    pub data_dir: Option<PathBuf>,
    pub engine: EngineSettings,
    pub device: DeviceSettings,
    /// Separate handbrake device; unset when the pedal device carries the handbrake
    pub handbrake: Option<HandbrakeSettings>,
    pub output: OutputSettings,
    pub cache: CacheSettings,
}

/// Input loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub tick_rate_hz: u32,
    pub observer_hz: u32,
    /// Skip thread and process priority changes
    pub disable_realtime: bool,
    /// Lock pages into memory (Linux)
    pub lock_memory: bool,
}

/// Physical pedal identity and report layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Byte offset of the first axis in an input report
    pub report_axis_offset: usize,
    pub axis_count: usize,
    /// Name used to hide the device from other applications
    pub identifier: String,
}

/// Standalone handbrake, read from one axis of its own device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandbrakeSettings {
    pub vendor_id: u16,
    pub product_id: u16,
    pub report_axis_offset: usize,
    pub axis_count: usize,
    /// Axis of the handbrake device that carries the lever
    pub axis: usize,
    pub identifier: String,
}

/// Virtual joystick slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub primary_id: u32,
    pub alternate_ids: Vec<u32>,
    pub attempts_per_id: u32,
    pub busy_backoff_ms: u64,
}

/// Curve-list cache freshness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub startup_grace_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            tick_rate_hz: engine.tick_rate_hz,
            observer_hz: engine.observer_hz,
            disable_realtime: false,
            lock_memory: false,
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            vendor_id: 0x1DD2,
            product_id: 0x2735,
            report_axis_offset: 1,
            axis_count: 4,
            identifier: "Sim Coaches P1 Pro Pedals".to_string(),
        }
    }
}

impl Default for HandbrakeSettings {
    fn default() -> Self {
        Self {
            vendor_id: 0x2341,
            product_id: 0x8036,
            report_axis_offset: 1,
            axis_count: 1,
            axis: 0,
            identifier: "Arduino Leonardo".to_string(),
        }
    }
}

impl HandbrakeSettings {
    pub fn device(&self) -> DeviceSettings {
        DeviceSettings {
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            report_axis_offset: self.report_axis_offset,
            axis_count: self.axis_count,
            identifier: self.identifier.clone(),
        }
    }
}

impl DeviceSettings {
    #[cfg(feature = "hid")]
    pub fn hid_config(&self) -> openpedal_device::HidDeviceConfig {
        openpedal_device::HidDeviceConfig {
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            identifier: self.identifier.clone(),
            report_axis_offset: self.report_axis_offset,
            axis_count: self.axis_count,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        let output = OutputConfig::default();
        Self {
            primary_id: output.primary_id,
            alternate_ids: output.alternate_ids,
            attempts_per_id: output.attempts_per_id,
            busy_backoff_ms: u64::try_from(output.busy_backoff.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        let cache = CacheConfig::default();
        Self {
            ttl_secs: cache.ttl.as_secs(),
            startup_grace_secs: cache.startup_grace.as_secs(),
        }
    }
}

impl ServiceConfig {
    /// Default location: `%LOCALAPPDATA%\openpedal\config.json` on Windows,
    /// `~/.config/openpedal/config.json` elsewhere.
    ///
    /// # Errors
    ///
    /// Fails when the base directory variable is not set.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(windows) {
            PathBuf::from(std::env::var("LOCALAPPDATA").context("LOCALAPPDATA environment variable not set")?)
        } else {
            PathBuf::from(std::env::var("HOME").context("HOME environment variable not set")?).join(".config")
        };
        Ok(config_dir.join("openpedal").join("config.json"))
    }

    /// Load from `path`, or from [`ServiceConfig::default_path`].
    ///
    /// A missing file is created with defaults. A file that does not parse
    /// is left alone and defaults are used.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or created, or when the loaded
    /// configuration does not validate.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let config = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            match serde_json::from_str::<ServiceConfig>(&content) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                    Self::default()
                }
            }
        } else {
            let config = Self::default();
            config.save(&path).await?;
            info!(path = %path.display(), "Created default config");
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Fails when the directory or the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`PedalError::Config`] for a tick rate of 0 or above 10 kHz, an
    /// observer rate of 0, no usable output slot, or a handbrake axis the
    /// handbrake device does not have.
    pub fn validate(&self) -> Result<(), PedalError> {
        if self.engine.tick_rate_hz == 0 || self.engine.tick_rate_hz > MAX_TICK_RATE_HZ {
            return Err(PedalError::config(format!(
                "engine.tick_rate_hz must be within 1..={MAX_TICK_RATE_HZ}, got {}",
                self.engine.tick_rate_hz
            )));
        }
        if self.engine.observer_hz == 0 {
            return Err(PedalError::config("engine.observer_hz must be greater than 0"));
        }
        if self.output.primary_id == 0 && self.output.alternate_ids.is_empty() {
            return Err(PedalError::config(
                "output.primary_id is 0 and no output.alternate_ids are configured",
            ));
        }
        if self.device.axis_count == 0 {
            return Err(PedalError::config("device.axis_count must be greater than 0"));
        }
        if let Some(handbrake) = &self.handbrake
            && handbrake.axis >= handbrake.axis_count
        {
            return Err(PedalError::config(format!(
                "handbrake.axis {} is out of range for a device with {} axes",
                handbrake.axis, handbrake.axis_count
            )));
        }
        Ok(())
    }

    pub fn data_layout(&self) -> DataLayout {
        DataLayout::new(self.data_dir.clone().unwrap_or_else(default_data_dir))
    }

    pub fn engine_config(&self) -> EngineConfig {
        let realtime = !self.engine.disable_realtime;
        EngineConfig {
            tick_rate_hz: self.engine.tick_rate_hz,
            observer_hz: self.engine.observer_hz,
            rt_setup: RTSetup::new()
                .with_high_priority(realtime)
                .with_lock_memory(self.engine.lock_memory),
            raise_process_priority: realtime,
            ..EngineConfig::default()
        }
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            primary_id: self.output.primary_id,
            alternate_ids: self.output.alternate_ids.clone(),
            attempts_per_id: self.output.attempts_per_id,
            busy_backoff: Duration::from_millis(self.output.busy_backoff_ms),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache.ttl_secs),
            startup_grace: Duration::from_secs(self.cache.startup_grace_secs),
        }
    }
}
