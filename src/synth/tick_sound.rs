//! Tick sound catalogue
//!
//! The five metronome voices offered by the sound-type picker. Each voice is
//! fully described by a fixed frequency and duration; harmonic and envelope
//! shaping is keyed off the variant inside [`synthesize`](super::synthesize).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TempoError;

/// Metronome tick voice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickSoundType {
    /// Classic mechanical metronome
    #[default]
    Classic,
    /// Sharp electronic beep
    Digital,
    /// Softer, muted tick
    Soft,
    /// Wood block
    Wooden,
    /// First-beat emphasis
    Accent,
}

impl TickSoundType {
    /// Every voice, in picker order
    pub const ALL: [TickSoundType; 5] = [
        TickSoundType::Classic,
        TickSoundType::Digital,
        TickSoundType::Soft,
        TickSoundType::Wooden,
        TickSoundType::Accent,
    ];

    /// Fundamental frequency in Hz
    pub const fn frequency_hz(self) -> f64 {
        match self {
            TickSoundType::Classic => 1000.0,
            TickSoundType::Digital => 1500.0,
            TickSoundType::Soft => 800.0,
            TickSoundType::Wooden => 400.0,
            TickSoundType::Accent => 1200.0,
        }
    }

    /// Length of one tick in seconds
    pub const fn duration_seconds(self) -> f64 {
        match self {
            TickSoundType::Classic => 0.10,
            TickSoundType::Digital => 0.05,
            TickSoundType::Soft => 0.15,
            TickSoundType::Wooden => 0.12,
            TickSoundType::Accent => 0.12,
        }
    }

    /// Exponent applied to the linear release ramp
    ///
    /// Soft decays convexly (0.5); every other voice decays steeply (2.0).
    pub const fn envelope_exponent(self) -> f64 {
        match self {
            TickSoundType::Soft => 0.5,
            _ => 2.0,
        }
    }

    /// Lower-case identifier used by config files, the CLI and Dart
    pub const fn as_str(self) -> &'static str {
        match self {
            TickSoundType::Classic => "classic",
            TickSoundType::Digital => "digital",
            TickSoundType::Soft => "soft",
            TickSoundType::Wooden => "wooden",
            TickSoundType::Accent => "accent",
        }
    }
}

impl fmt::Display for TickSoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TickSoundType {
    type Err = TempoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        TickSoundType::ALL
            .into_iter()
            .find(|sound| sound.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| TempoError::SoundTypeInvalid {
                name: s.to_string(),
            })
    }
}
