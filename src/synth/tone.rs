//! Tone synthesis - deterministic percussive tick rendering
//!
//! Renders one metronome tick per [`TickSoundType`]:
//! - Sine fundamental plus per-voice harmonic enrichment
//! - Fixed normalization divisor (2.0), not peak normalization
//! - 10ms linear attack multiplied by a shaped linear release
//!
//! Output is a mono buffer at a fixed 44.1kHz. The same voice always renders
//! bit-identical samples: no randomness, no clock reads.

use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use super::tick_sound::TickSoundType;

/// Sample rate of every synthesized tone in Hz
pub const SAMPLE_RATE: u32 = 44_100;

/// Synthesized tones are mono
pub const CHANNELS: u16 = 1;

/// Length of the linear attack ramp in seconds
const ATTACK_SECONDS: f64 = 0.01;

/// Fixed divisor applied to the summed harmonics
const NORMALIZATION_DIVISOR: f64 = 2.0;

/// Immutable rendered tick
///
/// Samples live behind an `Arc<[f32]>`, so clones are cheap and no holder can
/// mutate a buffer once it has been rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneBuffer {
    sound: TickSoundType,
    sample_rate: u32,
    samples: Arc<[f32]>,
}

impl ToneBuffer {
    /// Voice this buffer was rendered from
    pub fn sound(&self) -> TickSoundType {
        self.sound
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        CHANNELS
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length of the buffer
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Number of samples rendered for a voice: `round(44100 × duration)`
///
/// # Examples
/// ```
/// use mindset_core::synth::{sample_count, TickSoundType};
///
/// assert_eq!(sample_count(TickSoundType::Classic), 4410);
/// assert_eq!(sample_count(TickSoundType::Digital), 2205);
/// assert_eq!(sample_count(TickSoundType::Soft), 6615);
/// ```
pub fn sample_count(sound: TickSoundType) -> usize {
    (SAMPLE_RATE as f64 * sound.duration_seconds()).round() as usize
}

/// Summed fundamental and overtones at time `t`, before normalization
fn harmonic_signal(sound: TickSoundType, t: f64) -> f64 {
    let f = sound.frequency_hz();
    let base = (2.0 * PI * f * t).sin();

    let enrichment = match sound {
        // First two overtones
        TickSoundType::Wooden => {
            0.5 * (4.0 * PI * f * t).sin() + 0.25 * (6.0 * PI * f * t).sin()
        }
        // Fifth above for emphasis
        TickSoundType::Accent => 0.7 * (2.0 * PI * (1.5 * f) * t).sin(),
        TickSoundType::Soft => 0.3 * (3.0 * PI * f * t).sin(),
        TickSoundType::Classic | TickSoundType::Digital => 0.0,
    };

    base + enrichment
}

/// Amplitude envelope for sample `index` of a `count`-sample tone
///
/// `attack = min(i / (sr × 0.01), 1)`, `release = 1 − i / count`,
/// `envelope = attack × release ^ exponent`.
pub fn envelope(sound: TickSoundType, index: usize, count: usize) -> f64 {
    let attack = (index as f64 / (SAMPLE_RATE as f64 * ATTACK_SECONDS)).min(1.0);
    let release = 1.0 - index as f64 / count as f64;
    attack * release.powf(sound.envelope_exponent())
}

/// Render one tick for `sound`
///
/// Total over every [`TickSoundType`] and free of side effects. Persisting
/// the result as a file is left to [`write_wav`](super::write_wav).
pub fn synthesize(sound: TickSoundType) -> ToneBuffer {
    let count = sample_count(sound);
    let sample_rate = SAMPLE_RATE as f64;

    let samples: Vec<f32> = (0..count)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let normalized = harmonic_signal(sound, t) / NORMALIZATION_DIVISOR;
            (normalized * envelope(sound, i, count)) as f32
        })
        .collect();

    ToneBuffer {
        sound,
        sample_rate: SAMPLE_RATE,
        samples: samples.into(),
    }
}

/// Single-slot tone cache
///
/// Holds the buffer for the currently selected voice only. Asking for a
/// different voice renders it and replaces the slot wholesale.
#[derive(Debug, Default)]
pub struct ToneCache {
    current: Option<Arc<ToneBuffer>>,
}

impl ToneCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached buffer for `sound`, rendering it on a miss
    pub fn get_or_synthesize(&mut self, sound: TickSoundType) -> Arc<ToneBuffer> {
        match &self.current {
            Some(buffer) if buffer.sound() == sound => Arc::clone(buffer),
            _ => {
                let buffer = Arc::new(synthesize(sound));
                log::debug!(
                    "[ToneCache] Rendered {} tick ({} samples)",
                    sound,
                    buffer.len()
                );
                self.current = Some(Arc::clone(&buffer));
                buffer
            }
        }
    }

    pub fn current(&self) -> Option<&Arc<ToneBuffer>> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
