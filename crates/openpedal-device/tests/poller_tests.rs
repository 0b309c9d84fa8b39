//! Device Poller behaviour against the mock device.

use std::sync::{Arc, Mutex};

use openpedal_calibration::{AxisMapping, Pedal, PedalSnapshot};
use openpedal_device::mock::{MockHandle, MockPedalDevice};
use openpedal_device::{
    DeviceCloak, DeviceError, DevicePoller, DeviceResult, DeviceState, PedalDevice,
};
use tracing_test::traced_test;

fn mock_poller(axis_count: usize, mapping: AxisMapping) -> (DevicePoller, MockHandle) {
    let (_device, handle) = MockPedalDevice::new("Test Pedals", axis_count);
    let opener_handle = handle.clone();
    let poller = DevicePoller::new(
        move || -> DeviceResult<Box<dyn PedalDevice>> { Ok(Box::new(opener_handle.reopen())) },
        mapping,
    );
    (poller, handle)
}

#[test]
fn test_no_device_reads_zeros() {
    let mut poller = DevicePoller::new(
        || -> DeviceResult<Box<dyn PedalDevice>> { Err(DeviceError::unavailable("no pedals")) },
        AxisMapping::default(),
    );

    assert_eq!(poller.initialize(), DeviceState::Unavailable);
    for _ in 0..3 {
        assert_eq!(poller.read(), PedalSnapshot::ZERO);
    }
}

#[test]
fn test_reads_are_rescaled_to_canonical_range() {
    let (mut poller, handle) = mock_poller(4, AxisMapping::default());
    assert_eq!(poller.initialize(), DeviceState::Connected { axis_count: 4 });

    handle.set_axis(0, 1.0);
    handle.set_axis(1, 0.0);
    handle.set_axis(2, -1.0);
    handle.set_axis(3, 0.5);

    let snapshot = poller.read();
    assert_eq!(snapshot.throttle, 65535);
    assert_eq!(snapshot.brake, 32768);
    assert_eq!(snapshot.clutch, 0);
    assert_eq!(snapshot.handbrake, 49151);
}

#[test]
fn test_transient_error_keeps_previous_value() {
    let (mut poller, handle) = mock_poller(4, AxisMapping::default());
    poller.initialize();

    handle.set_axis(0, 0.0);
    handle.set_axis(1, 0.0);
    let first = poller.read();

    handle.set_failing(0, true);
    handle.set_axis(0, 1.0);
    handle.set_axis(1, 1.0);
    let second = poller.read();

    assert_eq!(second.throttle, first.throttle);
    assert_eq!(second.brake, 65535);
    assert_eq!(poller.transient_errors(), 1);
    assert!(poller.state().is_connected());
}

#[test]
#[traced_test]
fn test_out_of_range_mapping_is_forced_unavailable_and_persisted() {
    let persisted: Arc<Mutex<Vec<AxisMapping>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_target = Arc::clone(&persisted);

    let (poller, handle) = mock_poller(3, AxisMapping::default());
    let mut poller = poller.with_mapping_sink(move |mapping: &AxisMapping| {
        sink_target.lock().unwrap_or_else(|e| e.into_inner()).push(*mapping);
    });

    assert_eq!(poller.initialize(), DeviceState::Connected { axis_count: 3 });
    assert_eq!(poller.mapping().axis(Pedal::Handbrake), None);
    assert_eq!(poller.mapping().axis(Pedal::Clutch), Some(2));

    let saved = persisted.lock().unwrap_or_else(|e| e.into_inner()).clone();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].handbrake, AxisMapping::UNAVAILABLE);
    assert!(logs_contain("marking pedals unavailable"));

    handle.set_axis(2, 1.0);
    let snapshot = poller.read();
    assert_eq!(snapshot.clutch, 65535);
    assert_eq!(snapshot.handbrake, 0);
}

#[test]
fn test_valid_mapping_is_not_persisted() {
    let calls = Arc::new(Mutex::new(0u32));
    let counter = Arc::clone(&calls);
    let (poller, _handle) = mock_poller(4, AxisMapping::default());
    let mut poller = poller.with_mapping_sink(move |_: &AxisMapping| {
        *counter.lock().unwrap_or_else(|e| e.into_inner()) += 1;
    });

    poller.initialize();
    assert_eq!(*calls.lock().unwrap_or_else(|e| e.into_inner()), 0);
}

#[test]
fn test_update_mapping_rejects_missing_axis() {
    let (mut poller, _handle) = mock_poller(2, AxisMapping::default());
    poller.initialize();

    assert!(poller.update_mapping(Pedal::Brake, 5).is_err());
    assert!(poller.update_mapping(Pedal::Brake, 0).is_ok());
    assert_eq!(poller.mapping().axis(Pedal::Brake), Some(0));
}

#[test]
fn test_disconnect_keeps_last_values_until_reacquire() {
    let (mut poller, handle) = mock_poller(4, AxisMapping::default());
    poller.initialize();

    handle.set_axis(0, 1.0);
    let before = poller.read();
    assert_eq!(before.throttle, 65535);

    handle.set_disconnected(true);
    assert_eq!(poller.read(), before);
    assert_eq!(poller.state(), DeviceState::Unavailable);
    assert_eq!(poller.disconnects(), 1);

    // No implicit reconnect from the read path
    let polls = handle.polls();
    handle.set_disconnected(false);
    assert_eq!(poller.read(), before);
    assert_eq!(handle.polls(), polls);

    assert!(poller.reacquire().is_connected());
    handle.set_axis(0, -1.0);
    assert_eq!(poller.read().throttle, 0);
}

#[derive(Clone, Default)]
struct RecordingCloak {
    events: Arc<Mutex<Vec<String>>>,
}

impl DeviceCloak for RecordingCloak {
    fn hide(&mut self, identifier: &str) -> DeviceResult<()> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(format!("hide {identifier}"));
        Ok(())
    }

    fn unhide(&mut self, identifier: &str) -> DeviceResult<()> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(format!("unhide {identifier}"));
        Ok(())
    }
}

#[test]
fn test_cloak_hides_on_open_and_unhides_on_drop() {
    let cloak = RecordingCloak::default();
    let events = Arc::clone(&cloak.events);
    {
        let (poller, _handle) = mock_poller(4, AxisMapping::default());
        let mut poller = poller.with_cloak(cloak);
        poller.initialize();
    }

    let events = events.lock().unwrap_or_else(|e| e.into_inner()).clone();
    assert_eq!(events, vec!["hide Test Pedals".to_string(), "unhide Test Pedals".to_string()]);
}

fn mock_handbrake() -> (impl FnMut() -> DeviceResult<Box<dyn PedalDevice>> + Send, MockHandle) {
    let (_device, handle) = MockPedalDevice::new("Test Handbrake", 1);
    let opener_handle = handle.clone();
    let opener = move || -> DeviceResult<Box<dyn PedalDevice>> { Ok(Box::new(opener_handle.reopen())) };
    (opener, handle)
}

#[test]
fn test_handbrake_from_separate_device() {
    let (poller, pedals) = mock_poller(3, AxisMapping::default());
    let (opener, handbrake) = mock_handbrake();
    let mut poller = poller.with_handbrake(opener, 0);

    assert_eq!(poller.initialize(), DeviceState::Connected { axis_count: 3 });
    assert_eq!(poller.handbrake_state(), Some(DeviceState::Connected { axis_count: 1 }));

    pedals.set_axis(0, 1.0);
    pedals.set_axis(2, -1.0);
    handbrake.set_axis(0, 0.0);

    let snapshot = poller.read();
    assert_eq!(snapshot.throttle, 65535);
    assert_eq!(snapshot.clutch, 0);
    assert_eq!(snapshot.handbrake, 32768);
    assert_eq!(handbrake.polls(), 1);
}

#[test]
#[traced_test]
fn test_missing_handbrake_device_leaves_handbrake_unavailable() {
    let (poller, pedals) = mock_poller(4, AxisMapping::default());
    let mut poller = poller.with_handbrake(
        || -> DeviceResult<Box<dyn PedalDevice>> { Err(DeviceError::unavailable("no handbrake")) },
        0,
    );

    assert!(poller.initialize().is_connected());
    assert_eq!(poller.handbrake_state(), Some(DeviceState::Unavailable));
    assert!(logs_contain("Handbrake device unavailable"));

    // Axis 3 of the pedal device is not consulted for the handbrake
    pedals.set_axis(1, 1.0);
    pedals.set_axis(3, 1.0);
    let snapshot = poller.read();
    assert_eq!(snapshot.brake, 65535);
    assert_eq!(snapshot.handbrake, 0);
}

#[test]
fn test_lost_handbrake_device_does_not_affect_pedals() {
    let (poller, pedals) = mock_poller(3, AxisMapping::default());
    let (opener, handbrake) = mock_handbrake();
    let mut poller = poller.with_handbrake(opener, 0);
    poller.initialize();

    handbrake.set_axis(0, 1.0);
    assert_eq!(poller.read().handbrake, 65535);

    handbrake.set_disconnected(true);
    pedals.set_axis(0, 1.0);
    let snapshot = poller.read();
    assert_eq!(snapshot.throttle, 65535);
    assert_eq!(snapshot.handbrake, 65535);
    assert!(poller.state().is_connected());
    assert_eq!(poller.handbrake_state(), Some(DeviceState::Unavailable));
    assert_eq!(poller.disconnects(), 1);

    handbrake.set_disconnected(false);
    poller.reacquire();
    handbrake.set_axis(0, -1.0);
    assert_eq!(poller.read().handbrake, 0);
}
