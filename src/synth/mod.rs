// Synth module - procedural metronome tick rendering

pub mod inspect;
pub mod tick_sound;
pub mod tone;
pub mod wav;

// Re-export commonly used types for convenience
pub use inspect::ToneReport;
pub use tick_sound::TickSoundType;
pub use tone::{envelope, sample_count, synthesize, ToneBuffer, ToneCache, CHANNELS, SAMPLE_RATE};
pub use wav::{write_temp_wav, write_wav};
