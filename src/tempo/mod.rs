// Tempo module - BPM values, timers, and the metronome scheduler

pub mod bpm;
pub mod clock;
pub mod scheduler;

pub use bpm::{Bpm, SpeedPreset};
pub use clock::{Clock, ManualClock, TickCallback, TimerHandle, TokioClock};
pub use scheduler::{SchedulerSnapshot, SchedulerStatus, TempoScheduler, TickEvent};
