//! Tempo scheduler
//!
//! Owns the metronome lifecycle: which tick to play, how often, and the one
//! repeating timer that plays it. Time comes from an injected [`Clock`] and
//! sound goes to an injected [`AudioOutput`], so the whole cadence can be
//! driven deterministically under test.
//!
//! # Lifecycle
//! ```text
//! Stopped --start(bpm, sound)--> Running   (tick now, then every 60/bpm s)
//! Running --set_bpm(bpm)-------> Running   (re-armed, no extra tick)
//! Running --set_sound_type(s)--> Running   (restart, tick now)
//! Running --stop()-------------> Stopped
//! ```
//! At most one timer is armed at any time. Every transition that arms a new
//! timer cancels the old one first, under the same lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::bpm::Bpm;
use super::clock::{Clock, TimerHandle};
use crate::engine::backend::AudioOutput;
use crate::error::{log_audio_error, TempoError};
use crate::synth::{TickSoundType, ToneBuffer, ToneCache};

const TICK_CHANNEL_CAPACITY: usize = 256;

/// One metronome tick, emitted after it was handed to the output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickEvent {
    /// Monotonic across restarts for the scheduler's lifetime
    pub sequence: u64,
    pub sound: TickSoundType,
    pub bpm: Bpm,
    /// Clock time of the tick
    pub at_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerStatus {
    Stopped,
    Running,
}

/// Point-in-time view of the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    pub status: SchedulerStatus,
    pub bpm: Bpm,
    pub sound: TickSoundType,
    /// Seconds between ticks while running
    pub interval_seconds: Option<f64>,
}

struct Running {
    buffer: Arc<ToneBuffer>,
    interval: Duration,
    timer: TimerHandle,
}

struct SchedulerState {
    bpm: Bpm,
    sound: TickSoundType,
    cache: ToneCache,
    running: Option<Running>,
}

/// Everything a firing needs, cloned into each timer callback
///
/// Holds the clock weakly: the clock owns the callback, so a strong
/// reference would keep both alive until the timer is cancelled.
#[derive(Clone)]
struct TickEmitter {
    clock: Weak<dyn Clock>,
    output: Arc<dyn AudioOutput>,
    ticks: broadcast::Sender<TickEvent>,
    sequence: Arc<AtomicU64>,
}

impl TickEmitter {
    fn emit(&self, buffer: &Arc<ToneBuffer>, bpm: Bpm) {
        if let Err(err) = self.output.play_immediate(buffer) {
            log_audio_error(&err, "metronome_tick");
        }

        let at = self
            .clock
            .upgrade()
            .map(|clock| clock.now())
            .unwrap_or_default();

        let event = TickEvent {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            sound: buffer.sound(),
            bpm,
            at_seconds: at.as_secs_f64(),
        };
        // No subscribers is fine
        let _ = self.ticks.send(event);
    }
}

/// Metronome scheduler
///
/// All methods take `&self`; state lives behind a mutex so the scheduler can
/// be shared between the UI thread and the timer thread.
pub struct TempoScheduler {
    clock: Arc<dyn Clock>,
    emitter: TickEmitter,
    state: Mutex<SchedulerState>,
}

impl TempoScheduler {
    /// Create a stopped scheduler with initial preferences
    pub fn new(
        clock: Arc<dyn Clock>,
        output: Arc<dyn AudioOutput>,
        bpm: Bpm,
        sound: TickSoundType,
    ) -> Self {
        let (ticks, _) = broadcast::channel(TICK_CHANNEL_CAPACITY);
        let emitter = TickEmitter {
            clock: Arc::downgrade(&clock),
            output,
            ticks,
            sequence: Arc::new(AtomicU64::new(0)),
        };

        Self {
            clock,
            emitter,
            state: Mutex::new(SchedulerState {
                bpm,
                sound,
                cache: ToneCache::new(),
                running: None,
            }),
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, SchedulerState>, TempoError> {
        self.state.lock().map_err(|_| TempoError::LockPoisoned {
            component: "tempo_scheduler".to_string(),
        })
    }

    /// Start ticking: one tick immediately, then one every `60 / bpm` seconds
    ///
    /// Calling `start` while running replaces the running cadence; the old
    /// timer is cancelled first.
    ///
    /// # Errors
    /// Returns `TempoError::TimerUnavailable` if the clock cannot arm a timer
    pub fn start(&self, bpm: Bpm, sound: TickSoundType) -> Result<(), TempoError> {
        let mut state = self.lock_state()?;
        self.disarm(&mut state);

        state.bpm = bpm;
        state.sound = sound;
        let buffer = state.cache.get_or_synthesize(sound);
        self.arm(&mut state, buffer)?;

        if let Some(running) = state.running.as_ref() {
            self.emitter.emit(&running.buffer, bpm);
        }

        log::info!(
            "[TempoScheduler] Started: {} BPM, {} tick every {:?}",
            bpm,
            sound,
            bpm.interval()
        );
        Ok(())
    }

    /// Stop ticking. No-op when already stopped.
    pub fn stop(&self) -> Result<(), TempoError> {
        let mut state = self.lock_state()?;
        if self.disarm(&mut state) {
            log::info!("[TempoScheduler] Stopped");
        }
        Ok(())
    }

    /// Change tempo
    ///
    /// While running, the timer is re-armed so the next tick lands one new
    /// interval from now; no extra tick is played. While stopped, the value
    /// is only stored for the next `start`. Setting the current tempo again
    /// leaves the running cadence untouched.
    pub fn set_bpm(&self, bpm: Bpm) -> Result<(), TempoError> {
        let mut state = self.lock_state()?;
        if state.bpm == bpm && state.running.is_some() {
            return Ok(());
        }
        state.bpm = bpm;

        let Some(running) = state.running.take() else {
            log::debug!("[TempoScheduler] Stored {} BPM for next start", bpm);
            return Ok(());
        };

        self.clock.cancel(running.timer);
        self.arm(&mut state, running.buffer)?;
        log::info!("[TempoScheduler] Retuned to {} BPM", bpm);
        Ok(())
    }

    /// Change the tick sound
    ///
    /// While running this is a full restart: old timer cancelled, new buffer
    /// rendered, one tick immediately. While stopped it only records the
    /// choice and never starts playback.
    pub fn set_sound_type(&self, sound: TickSoundType) -> Result<(), TempoError> {
        let mut state = self.lock_state()?;
        state.sound = sound;

        if !self.disarm(&mut state) {
            log::debug!("[TempoScheduler] Stored {} tick for next start", sound);
            return Ok(());
        }

        let buffer = state.cache.get_or_synthesize(sound);
        self.arm(&mut state, buffer)?;
        if let Some(running) = state.running.as_ref() {
            self.emitter.emit(&running.buffer, state.bpm);
        }

        log::info!("[TempoScheduler] Switched to {} tick", sound);
        Ok(())
    }

    /// Arm one repeating timer for `buffer` at the current tempo
    fn arm(&self, state: &mut SchedulerState, buffer: Arc<ToneBuffer>) -> Result<(), TempoError> {
        let bpm = state.bpm;
        let interval = bpm.interval();

        let emitter = self.emitter.clone();
        let tick_buffer = Arc::clone(&buffer);
        let timer = self
            .clock
            .schedule_repeating(interval, Box::new(move || emitter.emit(&tick_buffer, bpm)))?;

        state.running = Some(Running {
            buffer,
            interval,
            timer,
        });
        Ok(())
    }

    /// Cancel the armed timer, if any. Returns whether one was armed.
    fn disarm(&self, state: &mut SchedulerState) -> bool {
        match state.running.take() {
            Some(running) => {
                self.clock.cancel(running.timer);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock_state()
            .map(|state| state.running.is_some())
            .unwrap_or(false)
    }

    pub fn bpm(&self) -> Result<Bpm, TempoError> {
        Ok(self.lock_state()?.bpm)
    }

    pub fn sound_type(&self) -> Result<TickSoundType, TempoError> {
        Ok(self.lock_state()?.sound)
    }

    /// Buffer currently being ticked, if running
    pub fn current_buffer(&self) -> Option<Arc<ToneBuffer>> {
        self.lock_state()
            .ok()?
            .running
            .as_ref()
            .map(|running| Arc::clone(&running.buffer))
    }

    pub fn snapshot(&self) -> Result<SchedulerSnapshot, TempoError> {
        let state = self.lock_state()?;
        Ok(SchedulerSnapshot {
            status: if state.running.is_some() {
                SchedulerStatus::Running
            } else {
                SchedulerStatus::Stopped
            },
            bpm: state.bpm,
            sound: state.sound,
            interval_seconds: state
                .running
                .as_ref()
                .map(|running| running.interval.as_secs_f64()),
        })
    }

    /// Receive every tick from now on
    pub fn subscribe_ticks(&self) -> broadcast::Receiver<TickEvent> {
        self.emitter.ticks.subscribe()
    }
}

impl Drop for TempoScheduler {
    fn drop(&mut self) {
        if let Ok(state) = self.state.get_mut() {
            if let Some(running) = state.running.take() {
                self.clock.cancel(running.timer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::backend::StubOutput;
    use crate::tempo::ManualClock;

    fn bpm(value: u32) -> Bpm {
        Bpm::try_from(value).unwrap()
    }

    fn fixture() -> (Arc<ManualClock>, Arc<StubOutput>, TempoScheduler) {
        let clock = Arc::new(ManualClock::new());
        let output = Arc::new(StubOutput::new());
        let scheduler = TempoScheduler::new(
            clock.clone(),
            output.clone(),
            Bpm::default(),
            TickSoundType::Classic,
        );
        (clock, output, scheduler)
    }

    #[test]
    fn test_start_plays_one_tick_immediately() {
        let (clock, output, scheduler) = fixture();
        scheduler.start(bpm(60), TickSoundType::Wooden).unwrap();

        assert!(scheduler.is_running());
        assert_eq!(output.played_sounds(), vec![TickSoundType::Wooden]);
        assert_eq!(clock.pending_timers(), 1);
    }

    #[test]
    fn test_restart_never_stacks_timers() {
        let (clock, output, scheduler) = fixture();
        scheduler.start(bpm(60), TickSoundType::Classic).unwrap();
        scheduler.start(bpm(60), TickSoundType::Classic).unwrap();
        assert_eq!(clock.pending_timers(), 1);

        clock.advance(Duration::from_secs(1));
        // two immediate ticks plus exactly one timer firing
        assert_eq!(output.play_count(), 3);
    }

    #[test]
    fn test_stop_is_idempotent_and_silences_timer() {
        let (clock, output, scheduler) = fixture();
        scheduler.stop().unwrap();
        assert!(!scheduler.is_running());

        scheduler.start(bpm(120), TickSoundType::Digital).unwrap();
        scheduler.stop().unwrap();
        scheduler.stop().unwrap();

        clock.advance(Duration::from_secs(10));
        assert_eq!(output.play_count(), 1);
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn test_set_bpm_while_stopped_only_stores() {
        let (clock, output, scheduler) = fixture();
        scheduler.set_bpm(bpm(140)).unwrap();

        assert!(!scheduler.is_running());
        assert_eq!(scheduler.bpm().unwrap(), bpm(140));
        assert_eq!(output.play_count(), 0);
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn test_set_sound_while_stopped_does_not_start() {
        let (clock, output, scheduler) = fixture();
        scheduler.set_sound_type(TickSoundType::Soft).unwrap();

        assert!(!scheduler.is_running());
        assert_eq!(scheduler.sound_type().unwrap(), TickSoundType::Soft);
        assert_eq!(output.play_count(), 0);
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn test_set_sound_while_running_restarts_with_immediate_tick() {
        let (clock, output, scheduler) = fixture();
        scheduler.start(bpm(60), TickSoundType::Classic).unwrap();
        clock.advance(Duration::from_millis(500));

        scheduler.set_sound_type(TickSoundType::Accent).unwrap();
        assert_eq!(
            output.played_sounds(),
            vec![TickSoundType::Classic, TickSoundType::Accent]
        );

        // next tick one full interval after the switch, not on the old grid
        clock.advance(Duration::from_millis(900));
        assert_eq!(output.play_count(), 2);
        clock.advance(Duration::from_millis(100));
        assert_eq!(output.last_sound(), Some(TickSoundType::Accent));
        assert_eq!(output.play_count(), 3);
        assert_eq!(clock.pending_timers(), 1);
    }

    #[test]
    fn test_same_bpm_keeps_phase() {
        let (clock, output, scheduler) = fixture();
        scheduler.start(bpm(60), TickSoundType::Classic).unwrap();
        clock.advance(Duration::from_millis(600));
        scheduler.set_bpm(bpm(60)).unwrap();

        clock.advance(Duration::from_millis(400));
        assert_eq!(output.play_count(), 2);
    }

    #[test]
    fn test_playback_failure_keeps_cadence() {
        let clock = Arc::new(ManualClock::new());
        let output = Arc::new(StubOutput::failing());
        let scheduler = TempoScheduler::new(
            clock.clone(),
            output.clone(),
            Bpm::default(),
            TickSoundType::Classic,
        );
        let mut ticks = scheduler.subscribe_ticks();

        scheduler.start(bpm(120), TickSoundType::Classic).unwrap();
        clock.advance(Duration::from_secs(1));

        assert!(scheduler.is_running());
        assert_eq!(output.attempt_count(), 3);
        assert_eq!(output.play_count(), 0);
        assert_eq!(ticks.try_recv().unwrap().sequence, 0);
    }

    #[test]
    fn test_snapshot_reports_interval_only_while_running() {
        let (_clock, _output, scheduler) = fixture();
        let stopped = scheduler.snapshot().unwrap();
        assert_eq!(stopped.status, SchedulerStatus::Stopped);
        assert_eq!(stopped.interval_seconds, None);

        scheduler.start(bpm(120), TickSoundType::Soft).unwrap();
        let running = scheduler.snapshot().unwrap();
        assert_eq!(running.status, SchedulerStatus::Running);
        assert_eq!(running.sound, TickSoundType::Soft);
        assert_eq!(running.interval_seconds, Some(0.5));
        assert!(scheduler.current_buffer().is_some());
    }

    #[test]
    fn test_dropping_scheduler_cancels_timer() {
        let (clock, output, scheduler) = fixture();
        scheduler.start(bpm(60), TickSoundType::Classic).unwrap();
        drop(scheduler);

        assert_eq!(clock.pending_timers(), 0);
        clock.advance(Duration::from_secs(3));
        assert_eq!(output.play_count(), 1);
    }
}
