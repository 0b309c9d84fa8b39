//! Input loop and observer threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use openpedal_calibration::{PedalSnapshot, SharedCalibration};
use openpedal_device::DevicePoller;
use openpedal_output::OutputSink;
use openpedal_scheduler::{AbsoluteScheduler, ProcessPriority};
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::counters::{AtomicCounters, CounterSnapshot};
use crate::error::EngineError;
use crate::monitor::RawMonitor;
use crate::observer::{LatestFrame, ObservedFrame, SnapshotObserver};
use crate::stats::{FrameStats, FrameWindow};

const RT_THREAD_NAME: &str = "pedal-rt";
const OBSERVER_THREAD_NAME: &str = "pedal-observer";

/// Timing summaries buffered for the observer thread.
const STATS_QUEUE_DEPTH: usize = 16;

/// Everything the loop thread owns.
struct InputLoop {
    poller: DevicePoller,
    sink: OutputSink,
    shared: SharedCalibration,
    scheduler: AbsoluteScheduler,
    config: EngineConfig,
    running: Arc<AtomicBool>,
    reacquire: Arc<AtomicBool>,
    counters: Arc<AtomicCounters>,
    latest: Arc<LatestFrame>,
    monitor: RawMonitor,
    stats_tx: Sender<FrameStats>,
    cycles: u64,
}

impl InputLoop {
    fn run(mut self) -> CounterSnapshot {
        if let Err(e) = self.scheduler.apply_rt_setup(&self.config.rt_setup) {
            warn!(error = %e, "Running input loop without elevated thread priority");
        }
        let state = self.poller.initialize();
        info!(
            rate_hz = self.config.tick_rate_hz,
            device = ?state,
            sink = ?self.sink.state(),
            "Input loop started"
        );

        let mut window = FrameWindow::new();
        let mut last_written: Option<PedalSnapshot> = None;

        while self.running.load(Ordering::Acquire) {
            let on_time = self.scheduler.wait_for_tick().is_ok();
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            let started = Instant::now();
            if !on_time {
                self.counters.inc_missed_deadline();
                window.record_missed();
            }

            self.cycle(&mut last_written);

            if window.record(started.elapsed(), self.config.slow_frame_threshold) {
                self.counters.inc_slow_frame();
            }
            if window.cycles() >= self.config.stats_interval_cycles {
                self.publish_stats(window.take());
            }
        }

        self.poller.release();
        self.sink.shutdown();
        if window.cycles() > 0 {
            self.publish_stats(window.take());
        }

        let summary = self.counters.snapshot();
        info!(
            cycles = summary.cycles,
            missed = summary.missed_deadlines,
            write_failures = summary.write_failures,
            "Input loop stopped"
        );
        summary
    }

    /// One poll, calibrate, write pass. Never blocks and never logs.
    #[inline]
    fn cycle(&mut self, last_written: &mut Option<PedalSnapshot>) {
        if self.reacquire.swap(false, Ordering::AcqRel) {
            self.poller.reacquire();
            self.counters.inc_reacquire();
        }

        let raw = self.poller.read();
        let device_mapping = *self.poller.mapping();
        let (calibrated, edited_mapping) = self.shared.read(|model| {
            let edited = (model.mapping != device_mapping).then_some(model.mapping);
            (model.apply_snapshot(&raw), edited)
        });
        if let Some(mapping) = edited_mapping {
            self.poller.set_mapping(mapping);
        }

        if *last_written != Some(calibrated) {
            if self.sink.write_snapshot(&calibrated) {
                *last_written = Some(calibrated);
            } else {
                // Retry on the next cycle even if nothing changes
                *last_written = None;
                self.counters.inc_write_failure();
            }
        }

        self.cycles = self.cycles.saturating_add(1);
        self.monitor.store(&raw);
        self.latest.publish(ObservedFrame {
            cycle: self.cycles,
            raw,
            calibrated,
        });
        self.counters.inc_snapshot_published();
        self.counters.inc_cycle();
    }

    fn publish_stats(&self, stats: FrameStats) {
        if let Err(TrySendError::Full(_)) = self.stats_tx.try_send(stats) {
            self.counters.inc_stats_dropped();
        }
    }
}

/// Observer thread: delivers the latest frame at the observer rate and logs timing.
fn observer_main(
    running: Arc<AtomicBool>,
    latest: Arc<LatestFrame>,
    stats_rx: Receiver<FrameStats>,
    mut observer: Option<Box<dyn SnapshotObserver>>,
    period: Duration,
) {
    debug!(period_ms = period.as_millis(), "Observer thread started");
    let mut next_frame = Instant::now() + period;

    while running.load(Ordering::Acquire) {
        match stats_rx.recv_timeout(next_frame.saturating_duration_since(Instant::now())) {
            Ok(stats) => log_frame_stats(&stats),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        if now >= next_frame {
            deliver(&latest, &mut observer);
            next_frame = now + period;
        }
    }

    // The loop thread has finished; pick up what it left behind.
    while let Ok(stats) = stats_rx.try_recv() {
        log_frame_stats(&stats);
    }
    deliver(&latest, &mut observer);
    debug!("Observer thread stopped");
}

fn deliver(latest: &LatestFrame, observer: &mut Option<Box<dyn SnapshotObserver>>) {
    let Some(frame) = latest.take() else {
        return;
    };
    if let Some(observer) = observer.as_mut() {
        observer.on_frame(&frame);
    }
}

fn log_frame_stats(stats: &FrameStats) {
    info!(
        cycles = stats.cycles,
        min_us = stats.min_ns / 1_000,
        avg_us = stats.avg_ns / 1_000,
        max_us = stats.max_ns / 1_000,
        slow = stats.slow_frames,
        missed = stats.missed_deadlines,
        "Input loop timing"
    );
}

/// The pedal input engine.
///
/// Built from an initialized [`DevicePoller`] and [`OutputSink`]; both move
/// onto the `pedal-rt` thread on [`Engine::start`] and are released there
/// before [`Engine::stop`] returns.
pub struct Engine {
    config: EngineConfig,
    shared: SharedCalibration,
    parts: Option<(DevicePoller, OutputSink)>,
    observer: Option<Box<dyn SnapshotObserver>>,
    running: Arc<AtomicBool>,
    reacquire: Arc<AtomicBool>,
    counters: Arc<AtomicCounters>,
    latest: Arc<LatestFrame>,
    monitor: RawMonitor,
    rt_thread: Option<JoinHandle<CounterSnapshot>>,
    observer_thread: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn new(config: EngineConfig, shared: SharedCalibration, poller: DevicePoller, sink: OutputSink) -> Self {
        Self {
            config,
            shared,
            parts: Some((poller, sink)),
            observer: None,
            running: Arc::new(AtomicBool::new(false)),
            reacquire: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(AtomicCounters::new()),
            latest: Arc::new(LatestFrame::new()),
            monitor: RawMonitor::new(),
            rt_thread: None,
            observer_thread: None,
        }
    }

    /// Receive the latest frame at the observer rate.
    pub fn with_observer(mut self, observer: impl SnapshotObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Spawn the input loop and observer threads.
    ///
    /// An engine runs once; it cannot be restarted after [`Engine::stop`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyStarted`] on a second call, or
    /// [`EngineError::Spawn`] when a thread cannot be created.
    pub fn start(&mut self) -> Result<(), EngineError> {
        let Some((poller, sink)) = self.parts.take() else {
            return Err(EngineError::AlreadyStarted);
        };

        if self.config.raise_process_priority
            && let Err(e) = ProcessPriority::raise()
        {
            warn!(error = %e, "Could not raise process priority");
        }

        let (stats_tx, stats_rx) = crossbeam::channel::bounded(STATS_QUEUE_DEPTH);
        let input_loop = InputLoop {
            poller,
            sink,
            shared: self.shared.clone(),
            scheduler: AbsoluteScheduler::with_rate_hz(self.config.tick_rate_hz),
            config: self.config.clone(),
            running: Arc::clone(&self.running),
            reacquire: Arc::clone(&self.reacquire),
            counters: Arc::clone(&self.counters),
            latest: Arc::clone(&self.latest),
            monitor: self.monitor.clone(),
            stats_tx,
            cycles: 0,
        };

        self.running.store(true, Ordering::Release);

        let rt_thread = thread::Builder::new()
            .name(RT_THREAD_NAME.to_string())
            .spawn(move || input_loop.run())
            .map_err(|source| {
                self.running.store(false, Ordering::Release);
                EngineError::Spawn {
                    thread: RT_THREAD_NAME,
                    source,
                }
            })?;
        self.rt_thread = Some(rt_thread);

        let observer_running = Arc::clone(&self.running);
        let observer_latest = Arc::clone(&self.latest);
        let observer = self.observer.take();
        let period = self.config.observer_period();
        match thread::Builder::new()
            .name(OBSERVER_THREAD_NAME.to_string())
            .spawn(move || observer_main(observer_running, observer_latest, stats_rx, observer, period))
        {
            Ok(handle) => self.observer_thread = Some(handle),
            Err(source) => {
                if let Err(e) = self.stop() {
                    error!(error = %e, "Input loop failed while aborting start");
                }
                return Err(EngineError::Spawn {
                    thread: OBSERVER_THREAD_NAME,
                    source,
                });
            }
        }

        info!(rate_hz = self.config.tick_rate_hz, observer_hz = self.config.observer_hz, "Engine started");
        Ok(())
    }

    /// Signal the loop to stop and wait for it.
    ///
    /// The loop finishes its current cycle, releases the device and the
    /// virtual output, and exits; the observer thread stops after it.
    /// Returns the final counters.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ThreadPanicked`] if either thread panicked.
    pub fn stop(&mut self) -> Result<CounterSnapshot, EngineError> {
        self.running.store(false, Ordering::Release);

        let mut result = Ok(self.counters.snapshot());
        if let Some(rt_thread) = self.rt_thread.take() {
            match rt_thread.join() {
                Ok(summary) => result = Ok(summary),
                Err(_) => {
                    error!("Input loop thread panicked");
                    result = Err(EngineError::ThreadPanicked(RT_THREAD_NAME));
                }
            }
        }

        if let Some(observer_thread) = self.observer_thread.take()
            && observer_thread.join().is_err()
        {
            error!("Observer thread panicked");
            if result.is_ok() {
                result = Err(EngineError::ThreadPanicked(OBSERVER_THREAD_NAME));
            }
        }

        if result.is_ok() {
            info!("Engine stopped");
        }
        result
    }

    pub fn is_running(&self) -> bool {
        self.rt_thread.is_some() && self.running.load(Ordering::Acquire)
    }

    /// Ask the loop to release and re-open the pedal device at the start of its next cycle.
    pub fn request_reacquire(&self) {
        self.reacquire.store(true, Ordering::Release);
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Lock-free view of the latest raw reading.
    pub fn raw_monitor(&self) -> RawMonitor {
        self.monitor.clone()
    }

    pub fn shared(&self) -> &SharedCalibration {
        &self.shared
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.rt_thread.is_some() {
            warn!("Engine dropped while running, stopping");
            if let Err(e) = self.stop() {
                error!(error = %e, "Engine stop failed during drop");
            }
        }
    }
}
