//! Tempo values
//!
//! BPM is a discrete picker value, not a free float: `20, 40, ..., 180`.
//! [`Bpm`] can only hold one of those, so a zero or negative tempo never
//! reaches the scheduler.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TempoError;

const NANOS_PER_MINUTE: u64 = 60_000_000_000;

/// Beats per minute, restricted to the picker set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Bpm(u32);

impl Bpm {
    /// Every supported tempo, ascending
    pub const ALL: [Bpm; 9] = [
        Bpm(20),
        Bpm(40),
        Bpm(60),
        Bpm(80),
        Bpm(100),
        Bpm(120),
        Bpm(140),
        Bpm(160),
        Bpm(180),
    ];

    pub const MIN: Bpm = Bpm(20);
    pub const MAX: Bpm = Bpm(180);

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Seconds between beats: `60 / bpm`
    pub fn interval_seconds(self) -> f64 {
        60.0 / self.0 as f64
    }

    /// Time between beats, truncated to whole nanoseconds
    ///
    /// # Examples
    /// ```
    /// use mindset_core::tempo::Bpm;
    /// use std::time::Duration;
    ///
    /// let bpm = Bpm::try_from(120).unwrap();
    /// assert_eq!(bpm.interval(), Duration::from_millis(500));
    /// ```
    pub fn interval(self) -> Duration {
        Duration::from_nanos(NANOS_PER_MINUTE / self.0 as u64)
    }
}

impl Default for Bpm {
    fn default() -> Self {
        SpeedPreset::default().bpm()
    }
}

impl TryFrom<u32> for Bpm {
    type Error = TempoError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Bpm::ALL
            .into_iter()
            .find(|bpm| bpm.0 == value)
            .ok_or(TempoError::BpmInvalid { bpm: value })
    }
}

impl From<Bpm> for u32 {
    fn from(bpm: Bpm) -> Self {
        bpm.0
    }
}

impl fmt::Display for Bpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named speeds offered by the affirmation player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedPreset {
    VerySlow,
    Slow,
    #[default]
    Medium,
    Fast,
    VeryFast,
}

impl SpeedPreset {
    pub const ALL: [SpeedPreset; 5] = [
        SpeedPreset::VerySlow,
        SpeedPreset::Slow,
        SpeedPreset::Medium,
        SpeedPreset::Fast,
        SpeedPreset::VeryFast,
    ];

    pub const fn bpm(self) -> Bpm {
        match self {
            SpeedPreset::VerySlow => Bpm(40),
            SpeedPreset::Slow => Bpm(60),
            SpeedPreset::Medium => Bpm(80),
            SpeedPreset::Fast => Bpm(100),
            SpeedPreset::VeryFast => Bpm(120),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            SpeedPreset::VerySlow => "very_slow",
            SpeedPreset::Slow => "slow",
            SpeedPreset::Medium => "medium",
            SpeedPreset::Fast => "fast",
            SpeedPreset::VeryFast => "very_fast",
        }
    }
}
