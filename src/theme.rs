//! Beat-synchronized theme colour cycling
//!
//! When auto-cycling is on, the active colour steps through
//! red → green → blue → gray → red on every beat. The cycler runs its own
//! repeating timer on the shared [`Clock`] and follows the same discipline as
//! the metronome: one timer at a time, re-armed on tempo change.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::TempoError;
use crate::tempo::{Bpm, Clock, SpeedPreset, TimerHandle};

/// Tempo used when no metronome tempo has been supplied
pub const DEFAULT_CYCLE_BPM: Bpm = SpeedPreset::Fast.bpm();

const THEME_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeColor {
    Red,
    #[default]
    Green,
    Blue,
    Gray,
    /// Selectable by hand, never part of the cycle
    White,
}

impl ThemeColor {
    /// Colours visited by auto-cycling, in order
    pub const PALETTE: [ThemeColor; 4] = [
        ThemeColor::Red,
        ThemeColor::Green,
        ThemeColor::Blue,
        ThemeColor::Gray,
    ];

    /// Next colour in the cycle; anything off-palette restarts at red
    pub fn next(self) -> ThemeColor {
        match Self::PALETTE.iter().position(|c| *c == self) {
            Some(index) => Self::PALETTE[(index + 1) % Self::PALETTE.len()],
            None => ThemeColor::Red,
        }
    }

    /// Linear RGB components in `0.0..=1.0`
    pub const fn rgb(self) -> [f32; 3] {
        match self {
            ThemeColor::Red => [1.0, 0.0, 0.0],
            ThemeColor::Green => [0.0, 1.0, 0.0],
            ThemeColor::Blue => [0.0, 0.0, 1.0],
            ThemeColor::Gray => [0.5, 0.5, 0.5],
            ThemeColor::White => [1.0, 1.0, 1.0],
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ThemeColor::Red => "red",
            ThemeColor::Green => "green",
            ThemeColor::Blue => "blue",
            ThemeColor::Gray => "gray",
            ThemeColor::White => "white",
        }
    }
}

impl fmt::Display for ThemeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Palette {
    color: ThemeColor,
    auto_cycling: bool,
}

struct CycleTimer {
    bpm: Bpm,
    handle: Option<TimerHandle>,
}

/// Callback told about every colour change, cycled or manual
pub type ColorListener = Arc<dyn Fn(ThemeColor) + Send + Sync>;

#[derive(Clone)]
struct ColorPublisher {
    changes: broadcast::Sender<ThemeColor>,
    listener: Option<ColorListener>,
}

impl ColorPublisher {
    fn publish(&self, color: ThemeColor) {
        let _ = self.changes.send(color);
        if let Some(listener) = &self.listener {
            listener(color);
        }
    }
}

/// Drives the active theme colour from a beat timer
pub struct ThemeCycler {
    clock: Arc<dyn Clock>,
    palette: Arc<Mutex<Palette>>,
    timer: Mutex<CycleTimer>,
    publisher: ColorPublisher,
}

impl ThemeCycler {
    pub fn new(clock: Arc<dyn Clock>, initial: ThemeColor, auto_cycling: bool) -> Self {
        let (changes, _) = broadcast::channel(THEME_CHANNEL_CAPACITY);
        Self {
            clock,
            palette: Arc::new(Mutex::new(Palette {
                color: initial,
                auto_cycling,
            })),
            timer: Mutex::new(CycleTimer {
                bpm: DEFAULT_CYCLE_BPM,
                handle: None,
            }),
            publisher: ColorPublisher {
                changes,
                listener: None,
            },
        }
    }

    /// Also report every colour change to `listener`
    ///
    /// Call before [`start`](Self::start); timers armed earlier keep the
    /// previous listener.
    pub fn with_listener(
        mut self,
        listener: impl Fn(ThemeColor) + Send + Sync + 'static,
    ) -> Self {
        self.publisher.listener = Some(Arc::new(listener));
        self
    }

    fn lock_timer(&self) -> Result<MutexGuard<'_, CycleTimer>, TempoError> {
        self.timer.lock().map_err(|_| TempoError::LockPoisoned {
            component: "theme_timer".to_string(),
        })
    }

    fn lock_palette(&self) -> Result<MutexGuard<'_, Palette>, TempoError> {
        self.palette.lock().map_err(|_| TempoError::LockPoisoned {
            component: "theme_palette".to_string(),
        })
    }

    /// Arm the beat timer at `bpm`, replacing any running one
    pub fn start(&self, bpm: Bpm) -> Result<(), TempoError> {
        let mut timer = self.lock_timer()?;
        if let Some(handle) = timer.handle.take() {
            self.clock.cancel(handle);
        }
        timer.bpm = bpm;
        timer.handle = Some(self.arm(bpm)?);
        log::debug!("[ThemeCycler] Beat timer armed at {} BPM", bpm);
        Ok(())
    }

    /// Follow a tempo change. Stored only when the timer is not running.
    pub fn set_bpm(&self, bpm: Bpm) -> Result<(), TempoError> {
        let mut timer = self.lock_timer()?;
        if timer.bpm == bpm && timer.handle.is_some() {
            return Ok(());
        }
        timer.bpm = bpm;

        if let Some(handle) = timer.handle.take() {
            self.clock.cancel(handle);
            timer.handle = Some(self.arm(bpm)?);
            log::debug!("[ThemeCycler] Beat timer retuned to {} BPM", bpm);
        }
        Ok(())
    }

    pub fn stop(&self) -> Result<(), TempoError> {
        let mut timer = self.lock_timer()?;
        if let Some(handle) = timer.handle.take() {
            self.clock.cancel(handle);
        }
        Ok(())
    }

    fn arm(&self, bpm: Bpm) -> Result<TimerHandle, TempoError> {
        let palette = Arc::clone(&self.palette);
        let publisher = self.publisher.clone();

        self.clock.schedule_repeating(
            bpm.interval(),
            Box::new(move || {
                let Ok(mut palette) = palette.lock() else {
                    return;
                };
                if !palette.auto_cycling {
                    return;
                }
                palette.color = palette.color.next();
                publisher.publish(palette.color);
            }),
        )
    }

    pub fn set_auto_cycling(&self, enabled: bool) -> Result<(), TempoError> {
        self.lock_palette()?.auto_cycling = enabled;
        log::info!(
            "[ThemeCycler] Auto-cycling {}",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    pub fn is_auto_cycling(&self) -> bool {
        self.lock_palette()
            .map(|palette| palette.auto_cycling)
            .unwrap_or(false)
    }

    /// Pick a colour by hand
    pub fn set_color(&self, color: ThemeColor) -> Result<(), TempoError> {
        let mut palette = self.lock_palette()?;
        palette.color = color;
        self.publisher.publish(color);
        Ok(())
    }

    pub fn active_color(&self) -> Result<ThemeColor, TempoError> {
        Ok(self.lock_palette()?.color)
    }

    pub fn is_running(&self) -> bool {
        self.lock_timer()
            .map(|timer| timer.handle.is_some())
            .unwrap_or(false)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ThemeColor> {
        self.publisher.changes.subscribe()
    }
}

impl Drop for ThemeCycler {
    fn drop(&mut self) {
        if let Ok(timer) = self.timer.get_mut() {
            if let Some(handle) = timer.handle.take() {
                self.clock.cancel(handle);
            }
        }
    }
}
