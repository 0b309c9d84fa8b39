//! Timing behaviour of the debounce coordinator on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use openpedal_debounce::{DebounceCoordinator, DebounceError};
use openpedal_errors::StorageError;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::{Instant, sleep};

const DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(2);

type Runs = Arc<Mutex<Vec<(Instant, u32)>>>;

/// Coordinator with one action "save" that records each run.
fn recording_coordinator() -> (DebounceCoordinator<u32>, Runs) {
    let debounce = DebounceCoordinator::new(Handle::current());
    let runs: Runs = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&runs);
    debounce.register(
        "save",
        move |value| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push((Instant::now(), value));
                Ok(())
            }
        },
        DELAY,
        MAX_DELAY,
    );
    (debounce, runs)
}

#[tokio::test(start_paused = true)]
async fn test_rapid_triggers_coalesce_to_last_payload() -> Result<(), Box<dyn std::error::Error>> {
    let (debounce, runs) = recording_coordinator();

    for value in 1..=5 {
        debounce.trigger("save", value)?;
        sleep(Duration::from_millis(100)).await;
    }
    sleep(Duration::from_secs(1)).await;

    let runs = runs.lock().clone();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs.first().map(|r| r.1), Some(5));

    let stats = debounce.stats("save").ok_or("no stats")?;
    assert_eq!(stats.triggers, 5);
    assert_eq!(stats.executions, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_runs_after_quiet_period() -> Result<(), Box<dyn std::error::Error>> {
    let (debounce, runs) = recording_coordinator();
    let start = Instant::now();

    debounce.trigger("save", 7)?;
    sleep(Duration::from_millis(499)).await;
    assert!(runs.lock().is_empty());

    sleep(Duration::from_millis(2)).await;
    let first = runs.lock().first().copied().ok_or("action did not run")?;
    assert_eq!(first.0.duration_since(start), DELAY);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_continuous_triggers_capped_by_max_delay() -> Result<(), Box<dyn std::error::Error>> {
    let (debounce, runs) = recording_coordinator();
    let start = Instant::now();

    // Every 150 ms for 5 s: never quiet for `DELAY`
    for value in 0..34 {
        debounce.trigger("save", value)?;
        sleep(Duration::from_millis(150)).await;
    }

    let runs = runs.lock().clone();
    let (first_at, _) = runs.first().copied().ok_or("action never ran")?;
    assert!(first_at.duration_since(start) <= MAX_DELAY);
    assert!(runs.len() >= 2, "expected one run per burst, got {}", runs.len());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unknown_action_rejected() {
    let (debounce, _runs) = recording_coordinator();
    assert!(matches!(
        debounce.trigger("nope", 1),
        Err(DebounceError::UnknownAction(name)) if name == "nope"
    ));
    assert!(debounce.stats("nope").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_execute_immediately_replaces_pending() -> Result<(), Box<dyn std::error::Error>> {
    let (debounce, runs) = recording_coordinator();

    debounce.trigger("save", 1)?;
    debounce.execute_immediately("save", 2).await?;
    assert_eq!(runs.lock().iter().map(|r| r.1).collect::<Vec<_>>(), vec![2]);

    sleep(Duration::from_secs(3)).await;
    assert_eq!(runs.lock().len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_all_discards_pending() -> Result<(), Box<dyn std::error::Error>> {
    let (debounce, runs) = recording_coordinator();

    debounce.trigger("save", 1)?;
    debounce.cancel_all();
    sleep(Duration::from_secs(3)).await;

    assert!(runs.lock().is_empty());
    assert!(!debounce.is_pending("save"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_flush_all_runs_pending_now() -> Result<(), Box<dyn std::error::Error>> {
    let (debounce, runs) = recording_coordinator();

    debounce.trigger("save", 3)?;
    assert_eq!(debounce.flush_all().await, 1);
    assert_eq!(debounce.flush_all().await, 0);

    sleep(Duration::from_secs(3)).await;
    assert_eq!(runs.lock().iter().map(|r| r.1).collect::<Vec<_>>(), vec![3]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failure_counted_and_not_requeued() -> Result<(), Box<dyn std::error::Error>> {
    let debounce = DebounceCoordinator::<u32>::new(Handle::current());
    debounce.register(
        "cloud",
        |_| async { Err(StorageError::persistence("network unreachable")) },
        DELAY,
        MAX_DELAY,
    );

    debounce.trigger("cloud", 1)?;
    sleep(Duration::from_secs(5)).await;

    let stats = debounce.stats("cloud").ok_or("no stats")?;
    assert_eq!((stats.executions, stats.failures), (1, 1));
    assert!(stats.last_execution.is_some());

    let immediate = debounce.execute_immediately("cloud", 2).await;
    assert!(matches!(immediate, Err(DebounceError::Failed { .. })));
    Ok(())
}
