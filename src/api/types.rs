use crate::synth::{sample_count, TickSoundType};
use crate::tempo::SpeedPreset;

/// Sound picker entry
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TickSoundInfo {
    pub name: String,
    pub frequency_hz: f64,
    pub duration_ms: f64,
    pub sample_count: usize,
}

impl From<TickSoundType> for TickSoundInfo {
    fn from(sound: TickSoundType) -> Self {
        Self {
            name: sound.as_str().to_string(),
            frequency_hz: sound.frequency_hz(),
            duration_ms: sound.duration_seconds() * 1000.0,
            sample_count: sample_count(sound),
        }
    }
}

/// Named speed preset
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SpeedPresetInfo {
    pub name: String,
    pub bpm: u32,
}

impl From<SpeedPreset> for SpeedPresetInfo {
    fn from(preset: SpeedPreset) -> Self {
        Self {
            name: preset.label().to_string(),
            bpm: preset.bpm().value(),
        }
    }
}
