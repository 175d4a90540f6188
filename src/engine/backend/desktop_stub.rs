use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::AudioError;
use crate::synth::{TickSoundType, ToneBuffer};

use super::AudioOutput;

/// Output stub used for deterministic testing and CLI simulation.
///
/// Records every tick handed to it instead of reaching audio hardware.
/// Can be switched into a failing mode to exercise error paths.
pub struct StubOutput {
    plays: Mutex<Vec<TickSoundType>>,
    attempts: AtomicU64,
    failing: AtomicBool,
}

impl StubOutput {
    pub fn new() -> Self {
        Self {
            plays: Mutex::new(Vec::new()),
            attempts: AtomicU64::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Stub that rejects every play with `PlaybackUnavailable`
    pub fn failing() -> Self {
        let stub = Self::new();
        stub.set_failing(true);
        stub
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful plays so far
    pub fn play_count(&self) -> usize {
        self.plays.lock().map(|plays| plays.len()).unwrap_or(0)
    }

    /// Every play request, including rejected ones
    pub fn attempt_count(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Sounds played, oldest first
    pub fn played_sounds(&self) -> Vec<TickSoundType> {
        self.plays
            .lock()
            .map(|plays| plays.clone())
            .unwrap_or_default()
    }

    pub fn last_sound(&self) -> Option<TickSoundType> {
        self.plays
            .lock()
            .ok()
            .and_then(|plays| plays.last().copied())
    }
}

impl Default for StubOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for StubOutput {
    fn play_immediate(&self, buffer: &Arc<ToneBuffer>) -> Result<(), AudioError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(AudioError::PlaybackUnavailable {
                reason: "stub output is in failing mode".to_string(),
            });
        }

        self.plays
            .lock()
            .map_err(|_| AudioError::LockPoisoned {
                component: "stub_output".to_string(),
            })?
            .push(buffer.sound());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
