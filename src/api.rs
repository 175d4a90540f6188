// Public API for flutter_rust_bridge integration
// This module provides FFI functions for Flutter to drive the metronome engine

#![allow(dead_code)] // FFI functions are called from Dart, not detected by Rust analyzer

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use tokio::runtime::Runtime;

use crate::engine::{EngineHandle, EngineSnapshot};
use crate::error::{log_audio_error, log_tempo_error, AudioError, TempoError};
use crate::synth::{synthesize, write_temp_wav, TickSoundType, ToneReport};
use crate::tempo::{Bpm, SpeedPreset};
use crate::theme::ThemeColor;

mod types;
pub use types::{SpeedPresetInfo, TickSoundInfo};

// Re-export error code constants for FFI exposure
pub use crate::error::{AudioErrorCodes, TempoErrorCodes};

/// Runtime hosting the engine's timers. Dart calls arrive on arbitrary
/// threads with no runtime of their own.
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Global EngineHandle instance, created by `init_metronome`
static ENGINE_HANDLE: OnceCell<EngineHandle> = OnceCell::new();

fn engine() -> Result<&'static EngineHandle, TempoError> {
    ENGINE_HANDLE.get().ok_or_else(|| {
        let err = TempoError::NotInitialized;
        log_tempo_error(&err, "engine_lookup");
        err
    })
}

/// Create the engine: load config, open the audio output, arm the theme timer.
///
/// Idempotent; later calls return immediately.
///
/// # Errors
/// - Timer runtime cannot be created
/// - Audio output cannot be opened (no device, permissions denied)
#[flutter_rust_bridge::frb(sync)]
pub fn init_metronome() -> Result<()> {
    crate::init_logging();

    ENGINE_HANDLE.get_or_try_init(|| {
        let runtime = RUNTIME.get_or_try_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("mindset-timer")
                .enable_time()
                .build()
                .context("creating timer runtime")
        })?;
        let _guard = runtime.enter();
        EngineHandle::with_platform_defaults()
    })?;

    Ok(())
}

/// Get the version of the metronome engine
#[flutter_rust_bridge::frb(sync)]
pub fn get_version() -> Result<String> {
    Ok(env!("CARGO_PKG_VERSION").to_string())
}

/// Start the metronome
///
/// Plays one tick immediately, then one every `60 / bpm` seconds.
///
/// # Arguments
/// * `bpm` - One of 20, 40, ..., 180
/// * `sound` - Tick sound name (`classic`, `wooden`, `digital`, `soft`, `accent`)
///
/// # Errors
/// - `BpmInvalid` / `SoundTypeInvalid` for values outside the supported sets
/// - `NotInitialized` if `init_metronome` has not run
#[flutter_rust_bridge::frb]
pub fn start_metronome(bpm: u32, sound: String) -> Result<(), TempoError> {
    let bpm = Bpm::try_from(bpm)?;
    let sound: TickSoundType = sound.parse()?;
    engine()?.start_metronome(bpm, sound)
}

/// Stop the metronome. No-op when already stopped.
#[flutter_rust_bridge::frb]
pub fn stop_metronome() -> Result<(), TempoError> {
    engine()?.stop_metronome()
}

/// Metronome button: start with the stored preferences or stop
///
/// # Returns
/// Whether the metronome is running afterwards
#[flutter_rust_bridge::frb]
pub fn toggle_metronome() -> Result<bool, TempoError> {
    engine()?.toggle_metronome()
}

/// BPM picker. Retunes a running metronome without an extra tick.
#[flutter_rust_bridge::frb]
pub fn set_bpm(bpm: u32) -> Result<(), TempoError> {
    let bpm = Bpm::try_from(bpm)?;
    engine()?.set_bpm(bpm)
}

/// Sound picker. Restarts a running metronome with the new tick.
#[flutter_rust_bridge::frb]
pub fn set_tick_sound(sound: String) -> Result<(), TempoError> {
    let sound: TickSoundType = sound.parse()?;
    engine()?.set_sound_type(sound)
}

/// Play one tick of `sound` for the picker preview
#[flutter_rust_bridge::frb]
pub fn preview_tick_sound(sound: String) -> Result<()> {
    let sound: TickSoundType = sound.parse()?;
    engine()?.preview_sound(sound)?;
    Ok(())
}

#[flutter_rust_bridge::frb]
pub fn set_theme_auto_cycling(enabled: bool) -> Result<(), TempoError> {
    engine()?.set_theme_auto_cycling(enabled)
}

#[flutter_rust_bridge::frb]
pub fn set_theme_color(color: ThemeColor) -> Result<(), TempoError> {
    engine()?.set_theme_color(color)
}

/// Current metronome and theme state for UI refresh
#[flutter_rust_bridge::frb(sync)]
pub fn metronome_state() -> Result<EngineSnapshot, TempoError> {
    engine()?.snapshot()
}

/// BPM picker values, ascending
#[flutter_rust_bridge::frb(sync)]
pub fn available_bpms() -> Vec<u32> {
    Bpm::ALL.iter().map(|bpm| bpm.value()).collect()
}

/// Sound picker entries
#[flutter_rust_bridge::frb(sync)]
pub fn tick_sounds() -> Vec<TickSoundInfo> {
    TickSoundType::ALL.into_iter().map(TickSoundInfo::from).collect()
}

/// Named speeds for the affirmation player
#[flutter_rust_bridge::frb(sync)]
pub fn speed_presets() -> Vec<SpeedPresetInfo> {
    SpeedPreset::ALL
        .into_iter()
        .map(SpeedPresetInfo::from)
        .collect()
}

/// Render a tick without playing it (waveform previews)
#[flutter_rust_bridge::frb(sync)]
pub fn render_tick_sound(sound: String) -> Result<Vec<f32>, TempoError> {
    let sound: TickSoundType = sound.parse()?;
    Ok(synthesize(sound).samples().to_vec())
}

/// Summary statistics for a rendered tick
#[flutter_rust_bridge::frb(sync)]
pub fn inspect_tick_sound(sound: String) -> Result<ToneReport, TempoError> {
    let sound: TickSoundType = sound.parse()?;
    Ok(ToneReport::from_buffer(&synthesize(sound)))
}

/// Write a tick to a temporary WAV file for file-based platform players
///
/// # Returns
/// Absolute path of the written file
#[flutter_rust_bridge::frb]
pub fn export_tick_sound(sound: String) -> Result<String> {
    let sound: TickSoundType = sound.parse()?;
    let path = write_temp_wav(&synthesize(sound)).map_err(|err: AudioError| {
        log_audio_error(&err, "export_tick_sound");
        err
    })?;
    Ok(path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests;
