//! Input loop behaviour end to end, against the mock device and the mock driver.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use openpedal_calibration::{AxisMapping, CalibrationCurve, CalibrationModel, Pedal, SharedCalibration};
use openpedal_device::mock::{MockHandle, MockPedalDevice};
use openpedal_device::{DeviceCloak, DevicePoller, DeviceResult, PedalDevice};
use openpedal_engine::{Engine, EngineConfig, EngineError, ObservedFrame};
use openpedal_output::mock::MockDriver;
use openpedal_output::{AxisUsage, OutputConfig, OutputSink, SlotStatus};

const SLOT: u32 = 1;
const WAIT: Duration = Duration::from_secs(5);

struct Rig {
    engine: Engine,
    device: MockHandle,
    driver: MockDriver,
    shared: SharedCalibration,
}

fn poller_for(handle: &MockHandle, mapping: AxisMapping) -> DevicePoller {
    let opener_handle = handle.clone();
    DevicePoller::new(
        move || -> DeviceResult<Box<dyn PedalDevice>> { Ok(Box::new(opener_handle.reopen())) },
        mapping,
    )
}

fn acquired_sink(driver: &MockDriver) -> Result<OutputSink, Box<dyn std::error::Error>> {
    driver.set_status(SLOT, SlotStatus::Free);
    let mut sink = OutputSink::new(Box::new(driver.clone()), OutputConfig::default());
    sink.acquire()?;
    Ok(sink)
}

fn rig_with(axis_count: usize, config: EngineConfig) -> Result<Rig, Box<dyn std::error::Error>> {
    let (_device, handle) = MockPedalDevice::new("Mock Pedals", axis_count);
    let driver = MockDriver::new();
    let shared = SharedCalibration::new(CalibrationModel::default());
    let engine = Engine::new(
        config,
        shared.clone(),
        poller_for(&handle, AxisMapping::default()),
        acquired_sink(&driver)?,
    );
    Ok(Rig {
        engine,
        device: handle,
        driver,
        shared,
    })
}

fn rig() -> Result<Rig, Box<dyn std::error::Error>> {
    rig_with(4, EngineConfig::unprivileged())
}

/// Poll `condition` until it holds or `WAIT` runs out.
fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

fn wait_cycles(engine: &Engine, cycles: u64) -> bool {
    let target = engine.counters().cycles + cycles;
    wait_until(|| engine.counters().cycles >= target)
}

fn last_write(driver: &MockDriver, usage: AxisUsage) -> Option<u16> {
    driver
        .writes()
        .iter()
        .rev()
        .find(|(_, written, _)| *written == usage)
        .map(|(_, _, value)| *value)
}

#[test]
fn test_calibrated_values_reach_driver() -> Result<(), Box<dyn std::error::Error>> {
    let mut rig = rig()?;
    rig.device.set_axis(0, 1.0);
    rig.device.set_axis(1, 0.0);

    rig.engine.start()?;
    let expected_brake = rig.shared.read(|model| model.apply(Pedal::Brake, 32768));
    assert!(wait_until(|| last_write(&rig.driver, AxisUsage::X) == Some(65535)));
    assert!(wait_until(|| last_write(&rig.driver, AxisUsage::Y) == Some(expected_brake)));
    assert!(rig.driver.writes().iter().all(|(slot, _, _)| *slot == SLOT));

    rig.engine.stop()?;
    Ok(())
}

#[test]
fn test_unchanged_values_written_once() -> Result<(), Box<dyn std::error::Error>> {
    let mut rig = rig()?;
    rig.engine.start()?;
    assert!(wait_cycles(&rig.engine, 50));
    let summary = rig.engine.stop()?;

    assert!(summary.cycles >= 50);
    assert_eq!(rig.driver.writes().len(), 4, "one write per channel");
    assert_eq!(summary.write_failures, 0);
    Ok(())
}

#[test]
fn test_stop_releases_device_and_slot() -> Result<(), Box<dyn std::error::Error>> {
    #[derive(Clone, Default)]
    struct RecordingCloak(Arc<Mutex<Vec<String>>>);

    impl DeviceCloak for RecordingCloak {
        fn hide(&mut self, identifier: &str) -> DeviceResult<()> {
            if let Ok(mut events) = self.0.lock() {
                events.push(format!("hide {identifier}"));
            }
            Ok(())
        }

        fn unhide(&mut self, identifier: &str) -> DeviceResult<()> {
            if let Ok(mut events) = self.0.lock() {
                events.push(format!("unhide {identifier}"));
            }
            Ok(())
        }
    }

    let (_device, handle) = MockPedalDevice::new("Mock Pedals", 4);
    let driver = MockDriver::new();
    let cloak = RecordingCloak::default();
    let poller = poller_for(&handle, AxisMapping::default()).with_cloak(cloak.clone());
    let mut engine = Engine::new(
        EngineConfig::unprivileged(),
        SharedCalibration::default(),
        poller,
        acquired_sink(&driver)?,
    );

    engine.start()?;
    assert!(wait_cycles(&engine, 10));
    assert!(engine.is_running());

    let started = Instant::now();
    engine.stop()?;
    assert!(started.elapsed() < Duration::from_millis(500), "stop took {:?}", started.elapsed());
    assert!(!engine.is_running());

    assert_eq!(driver.relinquished(), vec![SLOT]);
    assert!(driver.owned().is_empty());
    let events = cloak.0.lock().unwrap_or_else(|e| e.into_inner()).clone();
    assert_eq!(events, vec!["hide Mock Pedals", "unhide Mock Pedals"]);
    Ok(())
}

#[test]
fn test_curve_edit_applies_live() -> Result<(), Box<dyn std::error::Error>> {
    let mut rig = rig()?;
    rig.device.set_axis(0, 0.0);
    rig.engine.start()?;

    let linear = rig.shared.read(|model| model.apply(Pedal::Throttle, 32768));
    assert!(wait_until(|| last_write(&rig.driver, AxisUsage::X) == Some(linear)));

    let ((), edited) = rig.shared.update(|model| {
        model.set_curve(Pedal::Throttle, CalibrationCurve::from_pairs("Flat", &[(0.0, 25.0), (100.0, 25.0)]));
    });
    let flattened = edited.apply(Pedal::Throttle, 32768);
    assert_ne!(flattened, linear);
    assert!(wait_until(|| last_write(&rig.driver, AxisUsage::X) == Some(flattened)));

    rig.engine.stop()?;
    Ok(())
}

#[test]
fn test_mapping_edit_reaches_poller() -> Result<(), Box<dyn std::error::Error>> {
    let mut rig = rig()?;
    rig.device.set_axis(2, -1.0);
    rig.device.set_axis(3, 1.0);
    rig.engine.start()?;
    assert!(wait_until(|| last_write(&rig.driver, AxisUsage::Z) == Some(0)));

    let (moved, _) = rig.shared.update(|model| model.mapping.update(Pedal::Clutch, 3, 4));
    moved?;
    assert!(wait_until(|| last_write(&rig.driver, AxisUsage::Z) == Some(65535)));

    rig.engine.stop()?;
    Ok(())
}

#[test]
fn test_missing_axis_mapping_corrected_once() -> Result<(), Box<dyn std::error::Error>> {
    let (_device, handle) = MockPedalDevice::new("Three Axis Pedals", 3);
    let driver = MockDriver::new();
    let shared = SharedCalibration::default();
    let corrections = Arc::new(Mutex::new(0u32));

    let sink_shared = shared.clone();
    let sink_count = Arc::clone(&corrections);
    let poller = poller_for(&handle, AxisMapping::default()).with_mapping_sink(move |mapping: &AxisMapping| {
        sink_shared.update(|model| model.mapping = *mapping);
        if let Ok(mut count) = sink_count.lock() {
            *count += 1;
        }
    });
    let mut engine = Engine::new(EngineConfig::unprivileged(), shared.clone(), poller, acquired_sink(&driver)?);

    engine.start()?;
    assert!(wait_cycles(&engine, 50));
    engine.stop()?;

    assert_eq!(shared.read(|model| model.mapping.axis(Pedal::Handbrake)), None);
    assert_eq!(*corrections.lock().unwrap_or_else(|e| e.into_inner()), 1);
    Ok(())
}

#[test]
fn test_observer_receives_latest_frames() -> Result<(), Box<dyn std::error::Error>> {
    let frames: Arc<Mutex<Vec<ObservedFrame>>> = Arc::new(Mutex::new(Vec::new()));
    let (_device, handle) = MockPedalDevice::new("Mock Pedals", 4);
    let driver = MockDriver::new();
    let config = EngineConfig {
        observer_hz: 100,
        ..EngineConfig::unprivileged()
    };
    let sink = Arc::clone(&frames);
    let mut engine = Engine::new(
        config,
        SharedCalibration::default(),
        poller_for(&handle, AxisMapping::default()),
        acquired_sink(&driver)?,
    )
    .with_observer(move |frame: &ObservedFrame| {
        if let Ok(mut frames) = sink.lock() {
            frames.push(*frame);
        }
    });

    handle.set_axis(0, 1.0);
    engine.start()?;
    assert!(wait_until(|| frames.lock().map(|f| f.len() >= 3).unwrap_or(false)));
    engine.stop()?;

    let frames = frames.lock().unwrap_or_else(|e| e.into_inner()).clone();
    assert!(frames.windows(2).all(|pair| pair.first().map(|f| f.cycle) < pair.get(1).map(|f| f.cycle)));
    let last = frames.last().ok_or("no frames")?;
    assert_eq!(last.raw.throttle, 65535);
    assert_eq!(last.calibrated.throttle, 65535);
    Ok(())
}

#[test]
fn test_raw_monitor_tracks_device() -> Result<(), Box<dyn std::error::Error>> {
    let mut rig = rig()?;
    let monitor = rig.engine.raw_monitor();
    rig.device.set_axis(1, 1.0);
    rig.engine.start()?;

    assert!(wait_until(|| monitor.load()[Pedal::Brake] == 65535));
    rig.engine.stop()?;
    Ok(())
}

#[test]
fn test_reacquire_after_disconnect() -> Result<(), Box<dyn std::error::Error>> {
    let mut rig = rig()?;
    rig.engine.start()?;
    assert!(wait_until(|| last_write(&rig.driver, AxisUsage::X) == Some(0)));

    rig.device.set_disconnected(true);
    assert!(wait_cycles(&rig.engine, 20));
    rig.device.set_axis(0, 1.0);
    assert!(wait_cycles(&rig.engine, 20));
    assert_eq!(last_write(&rig.driver, AxisUsage::X), Some(0), "lost device keeps last values");

    rig.device.set_disconnected(false);
    assert!(wait_cycles(&rig.engine, 20));
    assert_eq!(last_write(&rig.driver, AxisUsage::X), Some(0), "re-acquiring is explicit");

    rig.engine.request_reacquire();
    assert!(wait_until(|| last_write(&rig.driver, AxisUsage::X) == Some(65535)));
    let summary = rig.engine.stop()?;
    assert_eq!(summary.reacquires, 1);
    Ok(())
}

#[test]
fn test_write_failures_counted_and_retried() -> Result<(), Box<dyn std::error::Error>> {
    let mut rig = rig()?;
    rig.driver.set_fail_writes(true);
    rig.device.set_axis(0, 1.0);
    rig.engine.start()?;

    assert!(wait_until(|| rig.engine.counters().write_failures >= 3));
    assert!(rig.driver.writes().is_empty());

    rig.driver.set_fail_writes(false);
    assert!(wait_until(|| last_write(&rig.driver, AxisUsage::X) == Some(65535)));
    rig.engine.stop()?;
    Ok(())
}

#[test]
fn test_engine_runs_once() -> Result<(), Box<dyn std::error::Error>> {
    let mut rig = rig()?;
    rig.engine.start()?;
    assert!(matches!(rig.engine.start(), Err(EngineError::AlreadyStarted)));

    rig.engine.stop()?;
    assert!(matches!(rig.engine.start(), Err(EngineError::AlreadyStarted)));
    Ok(())
}

#[test]
fn test_missing_device_still_writes_zeros() -> Result<(), Box<dyn std::error::Error>> {
    let driver = MockDriver::new();
    let poller = DevicePoller::new(
        || -> DeviceResult<Box<dyn PedalDevice>> { Err(openpedal_device::DeviceError::unavailable("unplugged")) },
        AxisMapping::default(),
    );
    let mut engine = Engine::new(EngineConfig::unprivileged(), SharedCalibration::default(), poller, acquired_sink(&driver)?);

    engine.start()?;
    assert!(wait_until(|| driver.writes().len() == 4));
    engine.stop()?;
    assert!(driver.writes().iter().all(|(_, _, value)| *value == 0));
    Ok(())
}
