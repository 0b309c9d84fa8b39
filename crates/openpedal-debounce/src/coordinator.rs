//! Coalescing scheduler keyed by action name.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use openpedal_errors::StorageError;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::actions::ActionSpec;
use crate::error::DebounceError;

type ActionFuture = Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send>>;
type ActionCallback<P> = Arc<dyn Fn(P) -> ActionFuture + Send + Sync>;
type ActionTable<P> = Arc<Mutex<HashMap<String, Action<P>>>>;

/// Counters for one action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionStats {
    pub triggers: u64,
    pub executions: u64,
    pub failures: u64,
    pub last_execution: Option<Instant>,
}

struct Action<P> {
    callback: ActionCallback<P>,
    delay: Duration,
    max_delay: Duration,
    pending: Option<P>,
    burst_started: Option<Instant>,
    /// Sleeping timer task; `None` once it has fired
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the pending timer is replaced or dropped
    generation: u64,
    stats: ActionStats,
}

impl<P> Action<P> {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.generation = self.generation.wrapping_add(1);
        self.burst_started = None;
    }
}

/// Delays and merges repeated triggers of named actions.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use openpedal_debounce::DebounceCoordinator;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), openpedal_debounce::DebounceError> {
/// let debounce = DebounceCoordinator::<u32>::new(tokio::runtime::Handle::current());
/// debounce.register(
///     "save",
///     |value| async move {
///         println!("saving {value}");
///         Ok(())
///     },
///     Duration::from_millis(10),
///     Duration::from_millis(50),
/// );
/// debounce.trigger("save", 1)?;
/// debounce.trigger("save", 2)?;
/// assert_eq!(debounce.flush_all().await, 1);
/// # Ok(())
/// # }
/// ```
pub struct DebounceCoordinator<P> {
    runtime: Handle,
    actions: ActionTable<P>,
}

impl<P: Send + 'static> DebounceCoordinator<P> {
    /// Coordinator whose timers run on `runtime`.
    ///
    /// Triggers may come from any thread.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            actions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register `callback` under `name`, replacing any earlier registration.
    pub fn register<F, Fut>(&self, name: impl Into<String>, callback: F, delay: Duration, max_delay: Duration)
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StorageError>> + Send + 'static,
    {
        let name = name.into();
        let callback: ActionCallback<P> = Arc::new(move |payload: P| -> ActionFuture { Box::pin(callback(payload)) });
        let action = Action {
            callback,
            delay,
            max_delay,
            pending: None,
            burst_started: None,
            timer: None,
            generation: 0,
            stats: ActionStats::default(),
        };

        let replaced = self.actions.lock().insert(name.clone(), action);
        if let Some(mut old) = replaced {
            old.disarm();
            debug!(action = %name, "Replaced debounced action");
        }
        debug!(
            action = %name,
            delay_ms = delay.as_millis(),
            max_delay_ms = max_delay.as_millis(),
            "Registered debounced action"
        );
    }

    /// Register one of the standard actions.
    pub fn register_spec<F, Fut>(&self, spec: ActionSpec, callback: F)
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StorageError>> + Send + 'static,
    {
        self.register(spec.name, callback, spec.delay, spec.max_delay);
    }

    /// Schedule `name` with `payload`, replacing any payload still pending.
    ///
    /// The timer restarts at `delay`, capped so the action runs no later than
    /// `max_delay` after the first trigger of the current burst.
    ///
    /// # Errors
    ///
    /// Returns [`DebounceError::UnknownAction`] if `name` is not registered.
    pub fn trigger(&self, name: &str, payload: P) -> Result<(), DebounceError> {
        let _runtime = self.runtime.enter();
        let now = Instant::now();

        let mut actions = self.actions.lock();
        let Some(action) = actions.get_mut(name) else {
            warn!(action = name, "Trigger for unregistered debounced action");
            return Err(DebounceError::UnknownAction(name.to_owned()));
        };

        action.stats.triggers = action.stats.triggers.saturating_add(1);
        action.pending = Some(payload);

        let burst_started = *action.burst_started.get_or_insert(now);
        let elapsed = now.saturating_duration_since(burst_started);
        let wait = action.delay.min(action.max_delay.saturating_sub(elapsed));

        if let Some(timer) = action.timer.take() {
            timer.abort();
        }
        action.generation = action.generation.wrapping_add(1);
        let generation = action.generation;

        let table = Arc::clone(&self.actions);
        let task_name = name.to_owned();
        action.timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(wait).await;
            fire(&table, &task_name, generation).await;
        }));
        Ok(())
    }

    /// Cancel any pending run of `name` and run it now with `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`DebounceError::UnknownAction`] if `name` is not registered, or
    /// [`DebounceError::Failed`] with the callback's error.
    pub async fn execute_immediately(&self, name: &str, payload: P) -> Result<(), DebounceError> {
        let callback = {
            let mut actions = self.actions.lock();
            let Some(action) = actions.get_mut(name) else {
                warn!(action = name, "Immediate run of unregistered debounced action");
                return Err(DebounceError::UnknownAction(name.to_owned()));
            };
            action.disarm();
            action.pending = None;
            Arc::clone(&action.callback)
        };

        let result = callback(payload).await;
        record(&self.actions, name, &result);
        result.map_err(|source| DebounceError::Failed {
            action: name.to_owned(),
            source,
        })
    }

    /// Run every pending action now instead of waiting for its timer.
    ///
    /// Returns the number of actions run.
    pub async fn flush_all(&self) -> usize {
        let due: Vec<(String, ActionCallback<P>, P)> = {
            let mut actions = self.actions.lock();
            actions
                .iter_mut()
                .filter_map(|(name, action)| {
                    let payload = action.pending.take()?;
                    action.disarm();
                    Some((name.clone(), Arc::clone(&action.callback), payload))
                })
                .collect()
        };

        let count = due.len();
        for (name, callback, payload) in due {
            let result = callback(payload).await;
            record(&self.actions, &name, &result);
        }
        if count > 0 {
            info!(actions = count, "Flushed pending debounced actions");
        }
        count
    }

    /// Drop every pending run without executing it.
    pub fn cancel_all(&self) {
        let mut discarded = 0usize;
        for action in self.actions.lock().values_mut() {
            if action.pending.take().is_some() {
                discarded = discarded.saturating_add(1);
            }
            action.disarm();
        }
        if discarded > 0 {
            info!(discarded, "Cancelled pending debounced actions");
        }
    }

    pub fn stats(&self, name: &str) -> Option<ActionStats> {
        self.actions.lock().get(name).map(|a| a.stats)
    }

    /// Whether `name` has a payload waiting for its timer.
    pub fn is_pending(&self, name: &str) -> bool {
        self.actions.lock().get(name).is_some_and(|a| a.pending.is_some())
    }
}

impl<P> Drop for DebounceCoordinator<P> {
    fn drop(&mut self) {
        for action in self.actions.lock().values_mut() {
            action.disarm();
        }
    }
}

/// Timer expiry: run the pending payload unless the timer was superseded.
async fn fire<P>(table: &ActionTable<P>, name: &str, generation: u64) {
    let (callback, payload) = {
        let mut actions = table.lock();
        let Some(action) = actions.get_mut(name) else {
            return;
        };
        if action.generation != generation {
            return;
        }
        action.timer = None;
        action.burst_started = None;
        let Some(payload) = action.pending.take() else {
            return;
        };
        (Arc::clone(&action.callback), payload)
    };

    let result = callback(payload).await;
    record(table, name, &result);
}

fn record<P>(table: &ActionTable<P>, name: &str, result: &Result<(), StorageError>) {
    if let Some(action) = table.lock().get_mut(name) {
        action.stats.executions = action.stats.executions.saturating_add(1);
        action.stats.last_execution = Some(Instant::now());
        if result.is_err() {
            action.stats.failures = action.stats.failures.saturating_add(1);
        }
    }
    match result {
        Ok(()) => debug!(action = name, "Debounced action completed"),
        Err(e) => warn!(action = name, error = %e, "Debounced action failed, retrying on next trigger"),
    }
}
