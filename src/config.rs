//! Configuration management
//!
//! Startup preferences for the metronome, theme and audio output, loaded
//! from JSON so they can be tuned without recompiling. Anything missing or
//! invalid falls back to defaults with a warning.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::synth::TickSoundType;
use crate::tempo::Bpm;
use crate::theme::ThemeColor;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub metronome: MetronomeConfig,
    pub theme: ThemeConfig,
    pub audio: AudioConfig,
}

/// Metronome preferences applied before the first start
///
/// Stored raw so a bad value in the file only resets that value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeConfig {
    pub bpm: u32,
    pub sound: String,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            bpm: Bpm::default().value(),
            sound: TickSoundType::default().as_str().to_string(),
        }
    }
}

impl MetronomeConfig {
    /// Configured tempo, or the default if it is not a supported value
    pub fn bpm(&self) -> Bpm {
        Bpm::try_from(self.bpm).unwrap_or_else(|err| {
            log::warn!("[Config] {}. Using {} BPM.", err, Bpm::default());
            Bpm::default()
        })
    }

    /// Configured tick sound, or the default if the name is unknown
    pub fn sound(&self) -> TickSoundType {
        self.sound.parse().unwrap_or_else(|err| {
            log::warn!(
                "[Config] {}. Using {} tick.",
                err,
                TickSoundType::default()
            );
            TickSoundType::default()
        })
    }
}

/// Theme colour preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Step through the palette on every beat
    pub auto_cycle: bool,
    pub initial_color: ThemeColor,
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Ticks that may wait for the device callback before plays are rejected
    pub output_queue_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            output_queue_capacity: 16,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Android builds ship without a readable assets path; use defaults
    #[cfg(target_os = "android")]
    pub fn load_android() -> Self {
        log::info!("[Config] Using default configuration on Android");
        Self::default()
    }

    /// Load configuration for non-Android platforms
    #[cfg(not(target_os = "android"))]
    pub fn load() -> Self {
        Self::load_from_file("assets/metronome_config.json")
    }

    /// Load whichever configuration source the current platform has
    pub fn load_platform() -> Self {
        #[cfg(target_os = "android")]
        {
            Self::load_android()
        }
        #[cfg(not(target_os = "android"))]
        {
            Self::load()
        }
    }
}
