//! Repeating timer primitives
//!
//! The scheduler never sleeps or spawns on its own. It asks a [`Clock`] for a
//! repeating timer and cancels it through the returned [`TimerHandle`].
//!
//! Two clocks ship with the crate:
//! - [`ManualClock`]: deterministic virtual time, advanced explicitly (tests, CLI simulation)
//! - [`TokioClock`]: wall-clock timers on a tokio runtime (apps, CLI playback)
//!
//! # Cancellation
//! Every timer's callback sits behind its own gate mutex. Firing holds the
//! gate while the callback runs; `cancel` takes the callback out under the
//! same gate. Once `cancel` returns, the callback is gone and no firing can
//! be in flight. A callback must therefore never cancel its own timer.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::TempoError;

/// Callback invoked on every timer firing
pub type TickCallback = Box<dyn FnMut() + Send + 'static>;

type CallbackGate = Arc<Mutex<Option<TickCallback>>>;

/// Identifies one scheduled repeating timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Time source plus repeating timer facility
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created
    fn now(&self) -> Duration;

    /// Fire `callback` every `interval`, first at `now() + interval`
    ///
    /// # Errors
    /// Returns `TempoError::TimerUnavailable` if the timer cannot be armed
    fn schedule_repeating(
        &self,
        interval: Duration,
        callback: TickCallback,
    ) -> Result<TimerHandle, TempoError>;

    /// Cancel a timer. Idempotent; unknown handles are ignored.
    fn cancel(&self, handle: TimerHandle);
}

/// Lock a mutex, recovering the data if a callback panicked while holding it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn zero_interval_error() -> TempoError {
    TempoError::TimerUnavailable {
        reason: "repeating interval must be non-zero".to_string(),
    }
}

// ============================================================================
// MANUAL CLOCK
// ============================================================================

struct ManualTimer {
    interval: Duration,
    next_due: Duration,
    gate: CallbackGate,
}

/// Deterministic virtual clock
///
/// Time only moves when [`advance`](ManualClock::advance) or
/// [`advance_to`](ManualClock::advance_to) is called. Due timers fire in
/// timestamp order (ties broken by scheduling order), and `now()` reports the
/// exact due time while each callback runs.
///
/// # Example
/// ```
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
/// use mindset_core::tempo::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let fired = Arc::new(AtomicU32::new(0));
/// let counter = Arc::clone(&fired);
/// clock
///     .schedule_repeating(
///         Duration::from_millis(500),
///         Box::new(move || {
///             counter.fetch_add(1, Ordering::SeqCst);
///         }),
///     )
///     .unwrap();
///
/// clock.advance(Duration::from_secs(2));
/// assert_eq!(fired.load(Ordering::SeqCst), 4);
/// ```
pub struct ManualClock {
    now: Mutex<Duration>,
    timers: Mutex<BTreeMap<u64, ManualTimer>>,
    next_id: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Duration::ZERO),
            timers: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Move time forward by `by`, firing every timer that falls due
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        self.advance_to(target);
    }

    /// Move time forward to `target`, firing every timer that falls due
    ///
    /// Targets in the past are ignored.
    pub fn advance_to(&self, target: Duration) {
        loop {
            let due = {
                let mut timers = lock(&self.timers);
                let next = timers
                    .iter()
                    .min_by_key(|(id, timer)| (timer.next_due, **id))
                    .map(|(id, timer)| (*id, timer.next_due));

                match next {
                    Some((id, at)) if at <= target => timers.get_mut(&id).map(|timer| {
                        timer.next_due = at + timer.interval;
                        (at, Arc::clone(&timer.gate))
                    }),
                    _ => None,
                }
            };

            let Some((at, gate)) = due else {
                break;
            };

            {
                let mut now = lock(&self.now);
                if at > *now {
                    *now = at;
                }
            }

            let mut slot = lock(&gate);
            if let Some(callback) = slot.as_mut() {
                callback();
            }
        }

        let mut now = lock(&self.now);
        if target > *now {
            *now = target;
        }
    }

    /// Number of live timers
    pub fn pending_timers(&self) -> usize {
        lock(&self.timers).len()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *lock(&self.now)
    }

    fn schedule_repeating(
        &self,
        interval: Duration,
        callback: TickCallback,
    ) -> Result<TimerHandle, TempoError> {
        if interval.is_zero() {
            return Err(zero_interval_error());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timer = ManualTimer {
            interval,
            next_due: self.now() + interval,
            gate: Arc::new(Mutex::new(Some(callback))),
        };
        lock(&self.timers).insert(id, timer);
        Ok(TimerHandle(id))
    }

    fn cancel(&self, handle: TimerHandle) {
        let removed = lock(&self.timers).remove(&handle.0);
        if let Some(timer) = removed {
            lock(&timer.gate).take();
        }
    }
}

// ============================================================================
// TOKIO CLOCK
// ============================================================================

struct TokioTimer {
    gate: CallbackGate,
    task: JoinHandle<()>,
}

/// Repeating timers backed by `tokio::time::interval`
///
/// Ticks stay on the grid laid down when the timer was armed: a late firing
/// skips missed beats rather than bunching them up or shifting the phase.
pub struct TokioClock {
    runtime: Handle,
    origin: Instant,
    timers: Mutex<HashMap<u64, TokioTimer>>,
    next_id: AtomicU64,
}

impl TokioClock {
    /// Create a clock that spawns its timers onto `runtime`
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            origin: Instant::now(),
            timers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Create a clock on the runtime the caller is running inside
    ///
    /// # Errors
    /// Returns `TempoError::TimerUnavailable` outside a tokio runtime
    pub fn from_current() -> Result<Self, TempoError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|err| TempoError::TimerUnavailable {
                reason: err.to_string(),
            })
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn schedule_repeating(
        &self,
        interval: Duration,
        callback: TickCallback,
    ) -> Result<TimerHandle, TempoError> {
        if interval.is_zero() {
            return Err(zero_interval_error());
        }

        let gate: CallbackGate = Arc::new(Mutex::new(Some(callback)));
        let task_gate = Arc::clone(&gate);
        // Grid starts when the timer is armed, not when the task is first polled
        let first = Instant::now() + interval;

        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(first, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let mut slot = lock(&task_gate);
                match slot.as_mut() {
                    Some(callback) => callback(),
                    None => break,
                }
            }
        });

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.timers).insert(id, TokioTimer { gate, task });
        Ok(TimerHandle(id))
    }

    fn cancel(&self, handle: TimerHandle) {
        let removed = lock(&self.timers).remove(&handle.0);
        if let Some(timer) = removed {
            lock(&timer.gate).take();
            timer.task.abort();
        }
    }
}

impl Drop for TokioClock {
    fn drop(&mut self) {
        for (_, timer) in lock(&self.timers).drain() {
            lock(&timer.gate).take();
            timer.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn recorder(clock: &Arc<ManualClock>) -> (Arc<Mutex<Vec<Duration>>>, TickCallback) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let source = Arc::clone(clock);
        let callback: TickCallback = Box::new(move || {
            sink.lock().unwrap().push(source.now());
        });
        (log, callback)
    }

    #[test]
    fn test_manual_clock_fires_on_interval_grid() {
        let clock = Arc::new(ManualClock::new());
        let (log, callback) = recorder(&clock);
        clock
            .schedule_repeating(Duration::from_millis(250), callback)
            .unwrap();

        clock.advance(Duration::from_millis(1000));

        let fired = log.lock().unwrap().clone();
        assert_eq!(
            fired,
            vec![
                Duration::from_millis(250),
                Duration::from_millis(500),
                Duration::from_millis(750),
                Duration::from_millis(1000),
            ]
        );
        assert_eq!(clock.now(), Duration::from_millis(1000));
    }

    #[test]
    fn test_manual_clock_cancel_stops_firing() {
        let clock = Arc::new(ManualClock::new());
        let (log, callback) = recorder(&clock);
        let handle = clock
            .schedule_repeating(Duration::from_secs(1), callback)
            .unwrap();

        clock.advance(Duration::from_millis(2500));
        clock.cancel(handle);
        clock.cancel(handle);
        clock.advance(Duration::from_secs(5));

        assert_eq!(log.lock().unwrap().len(), 2);
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn test_manual_clock_interleaves_timers_in_time_order() {
        let clock = Arc::new(ManualClock::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        for (label, millis) in [("slow", 300u64), ("fast", 200u64)] {
            let sink = Arc::clone(&order);
            clock
                .schedule_repeating(
                    Duration::from_millis(millis),
                    Box::new(move || sink.lock().unwrap().push(label)),
                )
                .unwrap();
        }

        clock.advance(Duration::from_millis(600));

        // fast@200, slow@300, fast@400, slow@600 and fast@600 (older timer first)
        assert_eq!(
            *order.lock().unwrap(),
            vec!["fast", "slow", "fast", "slow", "fast"]
        );
    }

    #[test]
    fn test_manual_clock_ignores_past_targets() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(3));
        clock.advance_to(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(3));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let clock = ManualClock::new();
        let result = clock.schedule_repeating(Duration::ZERO, Box::new(|| {}));
        assert!(matches!(result, Err(TempoError::TimerUnavailable { .. })));
    }

    #[test]
    fn test_tokio_clock_requires_runtime() {
        assert!(matches!(
            TokioClock::from_current(),
            Err(TempoError::TimerUnavailable { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_fires_and_cancels() {
        let clock = TokioClock::from_current().unwrap();
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);

        let handle = clock
            .schedule_repeating(
                Duration::from_secs(1),
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);

        clock.cancel(handle);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_grid_starts_when_armed() {
        let clock = TokioClock::from_current().unwrap();
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);

        let armed = Instant::now();
        clock
            .schedule_repeating(
                Duration::from_secs(1),
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        // Time passes before the timer task gets its first poll
        tokio::time::advance(Duration::from_millis(300)).await;
        tokio::time::sleep_until(armed + Duration::from_millis(1100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::sleep_until(armed + Duration::from_millis(2100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
