//! Startup and shutdown wiring of the pedal pipeline.
//!
//! Startup order: load the stored calibration (pulling it from the cloud
//! only when nothing is stored locally), seed the curve presets, register
//! the debounced saves, open the device and the virtual joystick, then start
//! the engine. Shutdown stops the engine, which releases both handles, and
//! flushes any save still waiting for its timer.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use openpedal_calibration::{AxisMapping, CalibrationModel, SharedCalibration};
use openpedal_debounce::actions::{CLOUD_PUSH, REFRESH_CURVES, SAVE_AXIS_MAPPINGS, SAVE_AXIS_RANGES, SAVE_CALIBRATION};
use openpedal_device::mock::MockPedalDevice;
use openpedal_device::{DeviceResult, DevicePoller, PedalDevice};
use openpedal_engine::{CalibrationEditor, CounterSnapshot, Engine, PersistQueue, RawMonitor};
use openpedal_errors::StorageError;
use openpedal_output::{NullDriver, OutputSink, VirtualOutputDriver};
use openpedal_store::{CalibrationFiles, CloudSync, CurveStore, SystemClock, curves_of, pull_missing_calibration, push_calibration};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::{DeviceSettings, ServiceConfig};

/// How `run` should drive the hardware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Simulated pedals and no virtual joystick
    pub simulate: bool,
    pub duration: Option<Duration>,
}

/// Loaded state of the daemon, ready to run the engine.
pub struct PedalService {
    config: ServiceConfig,
    files: Arc<CalibrationFiles>,
    curves: Arc<CurveStore>,
    shared: SharedCalibration,
    persist: Arc<PersistQueue>,
}

fn persistence_error(e: anyhow::Error) -> StorageError {
    StorageError::persistence(format!("{e:#}"))
}

impl PedalService {
    /// Load calibration and curves and register the debounced saves.
    ///
    /// Must be called inside a tokio runtime; the save timers run on it.
    ///
    /// # Errors
    ///
    /// Fails when the data directory cannot be created or read.
    pub async fn prepare(config: ServiceConfig, cloud: Arc<dyn CloudSync>) -> Result<Self> {
        let layout = config.data_layout();
        tokio::fs::create_dir_all(layout.root())
            .await
            .with_context(|| format!("Failed to create data directory {}", layout.root().display()))?;

        let files = Arc::new(CalibrationFiles::new(layout.clone()));
        match pull_missing_calibration(&files, cloud.as_ref()).await {
            Ok(0) => {}
            Ok(pulled) => info!(pedals = pulled, "Using calibration from cloud"),
            Err(e) => warn!(error = %format!("{e:#}"), "Could not store calibration pulled from cloud"),
        }
        let model = files.load_model().await.context("Failed to load calibration")?;

        let curves = Arc::new(
            CurveStore::open(layout, config.cache_config(), Arc::new(SystemClock), SystemTime::now())
                .await
                .context("Failed to open curve store")?,
        );
        match curves.ensure_default_presets().await {
            Ok(0) => debug!("Curve presets already present"),
            Ok(seeded) => debug!(seeded, "Seeded default curve presets"),
            Err(e) => warn!(error = %format!("{e:#}"), "Failed to seed default curve presets"),
        }

        let persist = Arc::new(PersistQueue::new(Handle::current()));
        register_actions(&persist, &files, &curves, &cloud);

        Ok(Self {
            config,
            files,
            curves,
            shared: SharedCalibration::new(model),
            persist,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn shared(&self) -> &SharedCalibration {
        &self.shared
    }

    pub fn persist(&self) -> &Arc<PersistQueue> {
        &self.persist
    }

    pub fn curves(&self) -> &Arc<CurveStore> {
        &self.curves
    }

    pub fn files(&self) -> &Arc<CalibrationFiles> {
        &self.files
    }

    /// Editor over the live calibration, sampling raw values from `monitor`.
    pub fn editor(&self, monitor: RawMonitor) -> CalibrationEditor {
        CalibrationEditor::new(self.shared.clone(), Arc::clone(&self.persist), monitor)
            .with_axis_count(self.config.device.axis_count)
    }

    /// Poller whose corrected mappings go back into the shared model and get saved.
    fn build_poller(&self, simulate: bool) -> DevicePoller {
        let mapping = self.shared.read(|model| model.mapping);
        let opener = device_opener(&self.config.device, "Simulated Pedals", simulate);

        let shared = self.shared.clone();
        let persist = Arc::clone(&self.persist);
        let poller = DevicePoller::new(opener, mapping).with_mapping_sink(move |corrected: &AxisMapping| {
            let ((), model) = shared.update(|model| model.mapping = *corrected);
            if let Err(e) = persist.trigger(SAVE_AXIS_MAPPINGS.name, model) {
                debug!(error = %e, "Corrected axis mapping not scheduled for saving");
            }
        });
        match &self.config.handbrake {
            Some(handbrake) => poller.with_handbrake(
                device_opener(&handbrake.device(), "Simulated Handbrake", simulate),
                handbrake.axis,
            ),
            None => poller,
        }
    }

    /// Acquire a virtual joystick slot off the async threads; acquisition backs off on busy slots.
    async fn build_sink(&self, simulate: bool) -> Result<OutputSink> {
        let driver: Box<dyn VirtualOutputDriver> = if simulate {
            Box::new(NullDriver)
        } else {
            openpedal_output::default_driver()
        };
        let mut sink = OutputSink::new(driver, self.config.output_config());
        tokio::task::spawn_blocking(move || {
            match sink.acquire() {
                Ok(slot) => debug!(slot, "Virtual output ready"),
                Err(e) => debug!(error = %e, "Continuing with simulated output"),
            }
            sink
        })
        .await
        .context("Output acquisition task failed")
    }

    /// Run the engine until `shutdown` resolves or `options.duration` elapses.
    ///
    /// # Errors
    ///
    /// Fails when the engine threads cannot be started or one of them panicked.
    pub async fn run(self, options: RunOptions, shutdown: impl Future<Output = ()>) -> Result<CounterSnapshot> {
        let poller = self.build_poller(options.simulate);
        let sink = self.build_sink(options.simulate).await?;
        let mut engine = Engine::new(self.config.engine_config(), self.shared.clone(), poller, sink);
        engine.start().context("Failed to start input engine")?;
        info!(
            simulate = options.simulate,
            started = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            "Pedal pipeline running"
        );

        match options.duration {
            Some(duration) => {
                tokio::select! {
                    () = shutdown => info!("Shutdown requested"),
                    () = tokio::time::sleep(duration) => info!(secs = duration.as_secs(), "Run duration elapsed"),
                }
            }
            None => {
                shutdown.await;
                info!("Shutdown requested");
            }
        }

        let counters = tokio::task::spawn_blocking(move || engine.stop())
            .await
            .context("Engine stop task failed")?
            .context("Input engine failed")?;

        let flushed = self.persist.flush_all().await;
        info!(
            cycles = counters.cycles,
            missed = counters.missed_deadlines,
            slow = counters.slow_frames,
            write_failures = counters.write_failures,
            flushed,
            "Pedal pipeline stopped"
        );
        Ok(counters)
    }
}

fn device_opener(
    settings: &DeviceSettings,
    simulated_name: &'static str,
    simulate: bool,
) -> impl FnMut() -> DeviceResult<Box<dyn PedalDevice>> + Send + 'static {
    let axis_count = settings.axis_count;
    #[cfg(feature = "hid")]
    let hid = settings.hid_config();
    move || -> DeviceResult<Box<dyn PedalDevice>> {
        if simulate {
            let (device, _handle) = MockPedalDevice::new(simulated_name, axis_count);
            return Ok(Box::new(device));
        }
        #[cfg(feature = "hid")]
        {
            Ok(Box::new(openpedal_device::HidPedalDevice::open(hid.clone())?))
        }
        #[cfg(not(feature = "hid"))]
        {
            Err(openpedal_device::DeviceError::unavailable("built without HID support"))
        }
    }
}

fn register_actions(
    persist: &PersistQueue,
    files: &Arc<CalibrationFiles>,
    curves: &Arc<CurveStore>,
    cloud: &Arc<dyn CloudSync>,
) {
    let calibration = Arc::clone(files);
    persist.register_spec(SAVE_CALIBRATION, move |model: CalibrationModel| {
        let files = Arc::clone(&calibration);
        async move {
            files
                .save_calibration(&curves_of(&model))
                .await
                .map_err(persistence_error)
        }
    });

    let ranges = Arc::clone(files);
    persist.register_spec(SAVE_AXIS_RANGES, move |model: CalibrationModel| {
        let files = Arc::clone(&ranges);
        async move { files.save_axis_ranges(&model.ranges()).await.map_err(persistence_error) }
    });

    let mappings = Arc::clone(files);
    persist.register_spec(SAVE_AXIS_MAPPINGS, move |model: CalibrationModel| {
        let files = Arc::clone(&mappings);
        async move { files.save_axis_mappings(&model.mapping).await.map_err(persistence_error) }
    });

    let store = Arc::clone(curves);
    persist.register_spec(REFRESH_CURVES, move |_model: CalibrationModel| {
        let store = Arc::clone(&store);
        async move {
            store.invalidate_all().await;
            Ok(())
        }
    });

    let remote = Arc::clone(cloud);
    persist.register_spec(CLOUD_PUSH, move |model: CalibrationModel| {
        let remote = Arc::clone(&remote);
        async move {
            push_calibration(remote.as_ref(), &curves_of(&model)).await;
            Ok(())
        }
    });
}
