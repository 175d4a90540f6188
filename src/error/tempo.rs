// Tempo scheduling error types and constants

use crate::error::ErrorCode;
use flutter_rust_bridge::frb;
use log::error;
use std::fmt;

/// Tempo error code constants exposed to Dart via FFI
///
/// Error code range: 1101-1105
#[frb(unignore)]
pub struct TempoErrorCodes {}

#[frb]
impl TempoErrorCodes {
    /// BPM is not one of the supported picker values
    pub const BPM_INVALID: i32 = 1101;

    /// Tick sound name does not match a known sound type
    pub const SOUND_TYPE_INVALID: i32 = 1102;

    /// No timer primitive is available (e.g. no async runtime)
    pub const TIMER_UNAVAILABLE: i32 = 1103;

    /// Scheduler state lock was poisoned
    pub const LOCK_POISONED: i32 = 1104;

    /// Metronome engine has not been initialized
    pub const NOT_INITIALIZED: i32 = 1105;

    /// Get BPM_INVALID error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn bpm_invalid() -> i32 {
        Self::BPM_INVALID
    }

    /// Get SOUND_TYPE_INVALID error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn sound_type_invalid() -> i32 {
        Self::SOUND_TYPE_INVALID
    }

    /// Get TIMER_UNAVAILABLE error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn timer_unavailable() -> i32 {
        Self::TIMER_UNAVAILABLE
    }

    /// Get LOCK_POISONED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn lock_poisoned() -> i32 {
        Self::LOCK_POISONED
    }

    /// Get NOT_INITIALIZED error code
    #[flutter_rust_bridge::frb(sync, getter)]
    pub fn not_initialized() -> i32 {
        Self::NOT_INITIALIZED
    }
}

/// Log a tempo error with structured context
pub fn log_tempo_error(err: &TempoError, context: &str) {
    error!(
        "Tempo error in {}: code={}, component=TempoScheduler, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Tempo scheduling errors
///
/// `BpmInvalid` and `SoundTypeInvalid` are configuration errors raised at the
/// boundary where untyped values (FFI, CLI, config files) become [`Bpm`] and
/// [`TickSoundType`]. Past that boundary the types make them unrepresentable.
///
/// [`Bpm`]: crate::tempo::Bpm
/// [`TickSoundType`]: crate::synth::TickSoundType
#[derive(Debug, Clone, PartialEq)]
pub enum TempoError {
    /// BPM is not one of the supported picker values
    BpmInvalid { bpm: u32 },

    /// Tick sound name does not match a known sound type
    SoundTypeInvalid { name: String },

    /// No timer primitive is available
    TimerUnavailable { reason: String },

    /// Scheduler state lock was poisoned
    LockPoisoned { component: String },

    /// Metronome engine has not been initialized
    NotInitialized,
}

impl ErrorCode for TempoError {
    fn code(&self) -> i32 {
        match self {
            TempoError::BpmInvalid { .. } => TempoErrorCodes::BPM_INVALID,
            TempoError::SoundTypeInvalid { .. } => TempoErrorCodes::SOUND_TYPE_INVALID,
            TempoError::TimerUnavailable { .. } => TempoErrorCodes::TIMER_UNAVAILABLE,
            TempoError::LockPoisoned { .. } => TempoErrorCodes::LOCK_POISONED,
            TempoError::NotInitialized => TempoErrorCodes::NOT_INITIALIZED,
        }
    }

    fn message(&self) -> String {
        match self {
            TempoError::BpmInvalid { bpm } => {
                format!("BPM must be one of 20, 40, ..., 180 (got {})", bpm)
            }
            TempoError::SoundTypeInvalid { name } => {
                format!("Unknown tick sound '{}'", name)
            }
            TempoError::TimerUnavailable { reason } => {
                format!("Timer unavailable: {}", reason)
            }
            TempoError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            TempoError::NotInitialized => {
                "Metronome not initialized. Call init_metronome() first.".to_string()
            }
        }
    }
}

impl fmt::Display for TempoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TempoError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for TempoError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_error_codes() {
        assert_eq!(
            TempoError::BpmInvalid { bpm: 0 }.code(),
            TempoErrorCodes::BPM_INVALID
        );
        assert_eq!(
            TempoError::SoundTypeInvalid {
                name: "cowbell".to_string()
            }
            .code(),
            TempoErrorCodes::SOUND_TYPE_INVALID
        );
        assert_eq!(
            TempoError::TimerUnavailable {
                reason: "test".to_string()
            }
            .code(),
            TempoErrorCodes::TIMER_UNAVAILABLE
        );
        assert_eq!(
            TempoError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            TempoErrorCodes::LOCK_POISONED
        );
        assert_eq!(
            TempoError::NotInitialized.code(),
            TempoErrorCodes::NOT_INITIALIZED
        );
    }

    #[test]
    fn test_tempo_error_messages() {
        let err = TempoError::BpmInvalid { bpm: 90 };
        assert!(err.message().contains("got 90"));

        let err = TempoError::SoundTypeInvalid {
            name: "cowbell".to_string(),
        };
        assert_eq!(err.message(), "Unknown tick sound 'cowbell'");

        let err = TempoError::NotInitialized;
        assert!(err.message().contains("init_metronome"));
    }

    #[test]
    fn test_error_code_getters() {
        assert_eq!(TempoErrorCodes::bpm_invalid(), 1101);
        assert_eq!(TempoErrorCodes::sound_type_invalid(), 1102);
        assert_eq!(TempoErrorCodes::timer_unavailable(), 1103);
        assert_eq!(TempoErrorCodes::lock_poisoned(), 1104);
        assert_eq!(TempoErrorCodes::not_initialized(), 1105);
    }

    #[test]
    fn test_error_propagation() {
        fn may_fail() -> Result<(), TempoError> {
            Err(TempoError::BpmInvalid { bpm: 0 })
        }

        fn caller() -> Result<(), TempoError> {
            may_fail()?;
            Ok(())
        }

        assert!(caller().is_err());
    }
}
