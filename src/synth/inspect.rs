// Tone inspection - summary statistics for rendered ticks
//
// Used by the CLI `render` command and diagnostics to confirm a tick has the
// expected length, level and pitch without listening to it.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use super::tick_sound::TickSoundType;
use super::tone::ToneBuffer;

/// Summary of a rendered tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToneReport {
    pub sound: TickSoundType,
    pub sample_rate: u32,
    pub sample_count: usize,
    pub duration_ms: f64,
    /// Largest absolute sample value
    pub peak_amplitude: f32,
    /// Root mean square over the whole buffer
    pub rms: f32,
    /// Frequency of the strongest FFT bin (excluding DC)
    pub dominant_hz: f32,
    /// Spacing between FFT bins, i.e. the precision of `dominant_hz`
    pub bin_width_hz: f32,
}

impl ToneReport {
    pub fn from_buffer(buffer: &ToneBuffer) -> Self {
        let samples = buffer.samples();
        let sample_rate = buffer.sample_rate();

        let peak_amplitude = samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
        let rms = if samples.is_empty() {
            0.0
        } else {
            (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
        };

        let (dominant_hz, bin_width_hz) = dominant_frequency(samples, sample_rate);

        Self {
            sound: buffer.sound(),
            sample_rate,
            sample_count: samples.len(),
            duration_ms: buffer.duration().as_secs_f64() * 1000.0,
            peak_amplitude,
            rms,
            dominant_hz,
            bin_width_hz,
        }
    }
}

/// Strongest non-DC frequency of `samples` and the bin width it was measured at
///
/// The FFT spans the whole buffer, so bin width is `sample_rate / len`.
fn dominant_frequency(samples: &[f32], sample_rate: u32) -> (f32, f32) {
    let len = samples.len();
    if len < 2 {
        return (0.0, 0.0);
    }

    let mut buffer: Vec<Complex<f32>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(len);
    fft.process(&mut buffer);

    let bin_width = sample_rate as f32 / len as f32;
    let peak_bin = buffer[1..len / 2 + 1]
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.norm().total_cmp(&b.norm()))
        .map(|(i, _)| i + 1)
        .unwrap_or(0);

    (peak_bin as f32 * bin_width, bin_width)
}
