// Error types for the MindSet metronome core
//
// This module defines custom error types for tone playback and tempo scheduling,
// providing structured error handling with error codes suitable for FFI communication.

mod audio;
mod tempo;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use tempo::{log_tempo_error, TempoError, TempoErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the FFI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_trait() {
        let audio_err: &dyn ErrorCode = &AudioError::PlaybackUnavailable {
            reason: "test".to_string(),
        };
        assert_eq!(audio_err.code(), 1001);

        let tempo_err: &dyn ErrorCode = &TempoError::NotInitialized;
        assert_eq!(tempo_err.code(), 1105);
    }
}
