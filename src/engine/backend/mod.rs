//! Output abstractions for the metronome engine.
//!
//! The scheduler only knows [`AudioOutput`]: hand over a rendered tick and
//! have it start sounding now. Platform backends turn that into a push onto a
//! lock-free queue drained by the device callback.

use std::sync::Arc;

use crate::config::AudioConfig;
use crate::error::AudioError;
use crate::synth::ToneBuffer;

/// Trait implemented by platform-specific audio outputs.
///
/// `play_immediate` must not block on the audio thread. A tick that arrives
/// while the previous one is still sounding restarts playback.
pub trait AudioOutput: Send + Sync {
    fn play_immediate(&self, buffer: &Arc<ToneBuffer>) -> Result<(), AudioError>;

    /// Short backend name for logs and diagnostics
    fn name(&self) -> &'static str;
}

mod voice;
pub use voice::ToneVoice;

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        mod oboe;
        pub use oboe::OboeOutput;
        type PlatformOutput = OboeOutput;
    } else {
        mod cpal;
        pub use cpal::CpalOutput;
        type PlatformOutput = CpalOutput;
    }
}

mod desktop_stub;
pub use desktop_stub::StubOutput;

/// Open the real output for the current platform
///
/// # Errors
/// Returns `AudioError::StreamOpenFailed` if no device stream could be opened
pub fn open_platform_output(config: &AudioConfig) -> Result<Arc<dyn AudioOutput>, AudioError> {
    let output = PlatformOutput::open(config)?;
    log::info!("[AudioOutput] Opened {} output", output.name());
    Ok(Arc::new(output))
}
