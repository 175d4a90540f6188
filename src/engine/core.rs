//! EngineHandle: composition root for the metronome.
//!
//! Wires configuration, clock, output, tempo scheduler and theme cycler
//! together, and publishes telemetry for every user-visible state change.
//! Collaborators are injected, so the same handle runs against real devices
//! in the app and against `ManualClock` + `StubOutput` in tests and the CLI.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::engine::backend::{open_platform_output, AudioOutput};
use crate::error::{AudioError, TempoError};
use crate::synth::{TickSoundType, ToneCache};
use crate::tempo::{Bpm, Clock, SchedulerSnapshot, TempoScheduler, TokioClock};
use crate::theme::{ThemeColor, ThemeCycler};

#[path = "core_subscriptions.rs"]
mod core_subscriptions;

const TELEMETRY_CHANNEL_CAPACITY: usize = 128;

/// Telemetry event emitted by the engine core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub timestamp_ms: u64,
    pub kind: TelemetryEventKind,
    pub detail: Option<String>,
}

/// Types of telemetry events supported by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEventKind {
    MetronomeStarted { bpm: u32, sound: TickSoundType },
    MetronomeStopped,
    BpmChanged { bpm: u32 },
    SoundChanged { sound: TickSoundType },
    ThemeChanged { color: ThemeColor },
}

/// Combined state for UI refreshes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub metronome: SchedulerSnapshot,
    pub theme_color: ThemeColor,
    pub theme_auto_cycling: bool,
}

/// EngineHandle orchestrates the scheduler, theme cycler and telemetry.
pub struct EngineHandle {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    output: Arc<dyn AudioOutput>,
    scheduler: TempoScheduler,
    theme: ThemeCycler,
    preview_cache: Mutex<ToneCache>,
    telemetry_tx: broadcast::Sender<TelemetryEvent>,
}

impl EngineHandle {
    /// Wire an engine from explicit collaborators.
    ///
    /// The metronome starts stopped with the configured preferences; the
    /// theme beat timer starts right away at the configured tempo.
    pub fn new(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        output: Arc<dyn AudioOutput>,
    ) -> Result<Self, TempoError> {
        let bpm = config.metronome.bpm();
        let sound = config.metronome.sound();

        let (telemetry_tx, _) = broadcast::channel(TELEMETRY_CHANNEL_CAPACITY);

        let scheduler = TempoScheduler::new(Arc::clone(&clock), Arc::clone(&output), bpm, sound);
        let theme = ThemeCycler::new(
            Arc::clone(&clock),
            config.theme.initial_color,
            config.theme.auto_cycle,
        )
        .with_listener(theme_telemetry(&clock, telemetry_tx.clone()));
        theme.start(bpm)?;

        log::info!(
            "[EngineHandle] Ready: {} BPM, {} tick, {} output",
            bpm,
            sound,
            output.name()
        );

        Ok(Self {
            config,
            clock,
            output,
            scheduler,
            theme,
            preview_cache: Mutex::new(ToneCache::new()),
            telemetry_tx,
        })
    }

    /// Engine with platform config, a `TokioClock` on the current runtime
    /// and the platform audio output.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn with_platform_defaults() -> anyhow::Result<Self> {
        let config = AppConfig::load_platform();
        let clock: Arc<dyn Clock> = Arc::new(TokioClock::from_current()?);
        let output = open_platform_output(&config.audio)?;
        Ok(Self::new(config, clock, output)?)
    }

    fn emit_event(&self, kind: TelemetryEventKind, detail: Option<String>) {
        send_event(&self.telemetry_tx, self.clock.now(), kind, detail);
    }

    // ========================================================================
    // METRONOME METHODS
    // ========================================================================

    /// Start the metronome: one tick now, then one per beat.
    pub fn start_metronome(&self, bpm: Bpm, sound: TickSoundType) -> Result<(), TempoError> {
        self.scheduler.start(bpm, sound)?;
        self.theme.set_bpm(bpm)?;
        self.emit_event(
            TelemetryEventKind::MetronomeStarted {
                bpm: bpm.value(),
                sound,
            },
            None,
        );
        Ok(())
    }

    /// Stop the metronome. Safe to call when already stopped.
    pub fn stop_metronome(&self) -> Result<(), TempoError> {
        if !self.scheduler.is_running() {
            return Ok(());
        }
        self.scheduler.stop()?;
        self.emit_event(TelemetryEventKind::MetronomeStopped, None);
        Ok(())
    }

    /// Flip between running and stopped using the stored preferences.
    ///
    /// # Returns
    /// Whether the metronome is running afterwards
    pub fn toggle_metronome(&self) -> Result<bool, TempoError> {
        if self.scheduler.is_running() {
            self.stop_metronome()?;
            Ok(false)
        } else {
            let bpm = self.scheduler.bpm()?;
            let sound = self.scheduler.sound_type()?;
            self.start_metronome(bpm, sound)?;
            Ok(true)
        }
    }

    /// Change tempo for both the metronome and the theme beat.
    pub fn set_bpm(&self, bpm: Bpm) -> Result<(), TempoError> {
        self.scheduler.set_bpm(bpm)?;
        self.theme.set_bpm(bpm)?;
        self.emit_event(TelemetryEventKind::BpmChanged { bpm: bpm.value() }, None);
        Ok(())
    }

    /// Change the tick sound; restarts the cadence when running.
    pub fn set_sound_type(&self, sound: TickSoundType) -> Result<(), TempoError> {
        self.scheduler.set_sound_type(sound)?;
        self.emit_event(TelemetryEventKind::SoundChanged { sound }, None);
        Ok(())
    }

    /// Play a single tick of `sound` without touching metronome state.
    pub fn preview_sound(&self, sound: TickSoundType) -> Result<(), AudioError> {
        let buffer = self
            .preview_cache
            .lock()
            .map_err(|_| AudioError::LockPoisoned {
                component: "preview_cache".to_string(),
            })?
            .get_or_synthesize(sound);
        self.output.play_immediate(&buffer)
    }

    pub fn is_metronome_running(&self) -> bool {
        self.scheduler.is_running()
    }

    // ========================================================================
    // THEME METHODS
    // ========================================================================

    pub fn set_theme_auto_cycling(&self, enabled: bool) -> Result<(), TempoError> {
        self.theme.set_auto_cycling(enabled)
    }

    /// Pick a colour by hand. Published as `ThemeChanged` like cycled colours.
    pub fn set_theme_color(&self, color: ThemeColor) -> Result<(), TempoError> {
        self.theme.set_color(color)
    }

    pub fn theme_color(&self) -> Result<ThemeColor, TempoError> {
        self.theme.active_color()
    }

    // ========================================================================
    // STATE
    // ========================================================================

    pub fn snapshot(&self) -> Result<EngineSnapshot, TempoError> {
        Ok(EngineSnapshot {
            metronome: self.scheduler.snapshot()?,
            theme_color: self.theme.active_color()?,
            theme_auto_cycling: self.theme.is_auto_cycling(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &TempoScheduler {
        &self.scheduler
    }

    pub fn theme(&self) -> &ThemeCycler {
        &self.theme
    }
}

fn send_event(
    tx: &broadcast::Sender<TelemetryEvent>,
    at: Duration,
    kind: TelemetryEventKind,
    detail: Option<String>,
) {
    // No subscribers is fine
    let _ = tx.send(TelemetryEvent {
        timestamp_ms: at.as_millis() as u64,
        kind,
        detail,
    });
}

/// Theme listener publishing every colour change as telemetry
///
/// The clock is held weakly: it owns the theme timer callback, which owns
/// this listener.
fn theme_telemetry(
    clock: &Arc<dyn Clock>,
    tx: broadcast::Sender<TelemetryEvent>,
) -> impl Fn(ThemeColor) + Send + Sync + 'static {
    let clock: Weak<dyn Clock> = Arc::downgrade(clock);
    move |color| {
        let at = clock
            .upgrade()
            .map(|clock| clock.now())
            .unwrap_or_default();
        send_event(&tx, at, TelemetryEventKind::ThemeChanged { color }, None);
    }
}
