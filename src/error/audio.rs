// Audio output error types and constants

use crate::error::ErrorCode;
use flutter_rust_bridge::frb;
use log::error;
use std::fmt;

/// Audio error code constants exposed to Dart via FFI
///
/// These constants provide a single source of truth for error codes
/// shared between Rust and Dart. The flutter_rust_bridge will automatically
/// generate corresponding Dart constants.
///
/// Error code range: 1001-1005
#[frb(unignore)]
pub struct AudioErrorCodes {}

#[frb]
impl AudioErrorCodes {
    /// Output device could not play a buffer
    pub const PLAYBACK_UNAVAILABLE: i32 = 1001;

    /// Failed to open audio stream
    pub const STREAM_OPEN_FAILED: i32 = 1002;

    /// Hardware error occurred
    pub const HARDWARE_ERROR: i32 = 1003;

    /// Writing a tone to disk failed
    pub const EXPORT_FAILED: i32 = 1004;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1005;

    // Getter methods for FFI exposure (flutter_rust_bridge requires methods not const)

    /// Get PLAYBACK_UNAVAILABLE error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn playback_unavailable() -> i32 {
        Self::PLAYBACK_UNAVAILABLE
    }

    /// Get STREAM_OPEN_FAILED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn stream_open_failed() -> i32 {
        Self::STREAM_OPEN_FAILED
    }

    /// Get HARDWARE_ERROR error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn hardware_error() -> i32 {
        Self::HARDWARE_ERROR
    }

    /// Get EXPORT_FAILED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn export_failed() -> i32 {
        Self::EXPORT_FAILED
    }

    /// Get LOCK_POISONED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn lock_poisoned() -> i32 {
        Self::LOCK_POISONED
    }
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioOutput, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio output errors
///
/// These errors cover the playback collaborator (device streams, buffer
/// hand-off) and exporting synthesized tones to disk.
///
/// Error code range: 1001-1005
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Output device could not play a buffer (queue full, device gone)
    PlaybackUnavailable { reason: String },

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Hardware error occurred
    HardwareError { details: String },

    /// Writing a tone to disk failed
    ExportFailed { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::PlaybackUnavailable { .. } => AudioErrorCodes::PLAYBACK_UNAVAILABLE,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::ExportFailed { .. } => AudioErrorCodes::EXPORT_FAILED,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::PlaybackUnavailable { reason } => {
                format!("Playback unavailable: {}", reason)
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::ExportFailed { reason } => {
                format!("Failed to export tone: {}", reason)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        AudioError::ExportFailed {
            reason: err.to_string(),
        }
    }
}
