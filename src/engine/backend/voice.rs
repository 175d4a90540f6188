//! Real-time tick voice shared by the stream backends
//!
//! The audio callback owns one [`ToneVoice`]. Buffers arrive over an rtrb
//! queue; each arrival restarts playback from sample 0, so a new tick always
//! preempts the tail of the previous one.
//!
//! Real-time safe: no allocation, no locks. A replaced or finished buffer may
//! hold the last reference to its samples (the scheduler's cache moves on
//! after a re-voice), so the voice never drops one itself. It pushes them onto
//! a return queue that the producer side empties, see [`release_retired`].

use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::synth::ToneBuffer;

/// Queue pair carrying retired buffers from the callback back to the caller
///
/// Sized so every buffer the play queue can hold, plus the one sounding,
/// fits without blocking.
pub fn return_queue(
    play_capacity: usize,
) -> (Producer<Arc<ToneBuffer>>, Consumer<Arc<ToneBuffer>>) {
    RingBuffer::new(play_capacity.max(1) * 2 + 1)
}

/// Drop every buffer the callback handed back. Call off the audio thread.
pub fn release_retired(queue: &mut Consumer<Arc<ToneBuffer>>) -> usize {
    let mut released = 0;
    while queue.pop().is_ok() {
        released += 1;
    }
    released
}

pub struct ToneVoice {
    current: Option<Arc<ToneBuffer>>,
    /// Read position in source samples (fractional when resampling)
    position: f64,
    output_rate: u32,
    retired: Producer<Arc<ToneBuffer>>,
}

impl ToneVoice {
    pub fn new(output_rate: u32, retired: Producer<Arc<ToneBuffer>>) -> Self {
        Self {
            current: None,
            position: 0.0,
            output_rate: output_rate.max(1),
            retired,
        }
    }

    /// Restart playback with `buffer`
    pub fn trigger(&mut self, buffer: Arc<ToneBuffer>) {
        self.retire();
        self.current = Some(buffer);
        self.position = 0.0;
    }

    fn retire(&mut self) {
        if let Some(buffer) = self.current.take() {
            // Full only if the producer side stopped releasing; the buffer
            // is then dropped here
            let _ = self.retired.push(buffer);
        }
    }

    /// Take every queued buffer; the newest one wins
    pub fn drain(&mut self, queue: &mut Consumer<Arc<ToneBuffer>>) {
        while let Ok(buffer) = queue.pop() {
            self.trigger(buffer);
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// Next output sample, linearly interpolated to the device rate
    pub fn next_sample(&mut self) -> f32 {
        let Some(buffer) = self.current.as_ref() else {
            return 0.0;
        };

        let samples = buffer.samples();
        let index = self.position as usize;
        if index >= samples.len() {
            self.retire();
            return 0.0;
        }

        let frac = (self.position - index as f64) as f32;
        let a = samples[index];
        let b = samples.get(index + 1).copied().unwrap_or(0.0);
        let value = a + (b - a) * frac;

        self.position += buffer.sample_rate() as f64 / self.output_rate as f64;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{synthesize, TickSoundType, SAMPLE_RATE};

    fn voice_with_returns(output_rate: u32) -> (ToneVoice, Consumer<Arc<ToneBuffer>>) {
        let (retired_tx, retired_rx) = return_queue(4);
        (ToneVoice::new(output_rate, retired_tx), retired_rx)
    }

    #[test]
    fn test_native_rate_plays_samples_verbatim_then_silence() {
        let tone = Arc::new(synthesize(TickSoundType::Digital));
        let (mut voice, _retired) = voice_with_returns(SAMPLE_RATE);
        voice.trigger(Arc::clone(&tone));

        let rendered: Vec<f32> = (0..tone.len()).map(|_| voice.next_sample()).collect();
        assert_eq!(rendered.as_slice(), tone.samples());

        assert_eq!(voice.next_sample(), 0.0);
        assert!(!voice.is_active());
    }

    #[test]
    fn test_retrigger_restarts_from_first_sample() {
        let tone = Arc::new(synthesize(TickSoundType::Classic));
        let (mut voice, _retired) = voice_with_returns(SAMPLE_RATE);
        voice.trigger(Arc::clone(&tone));
        for _ in 0..1000 {
            voice.next_sample();
        }

        voice.trigger(Arc::clone(&tone));
        assert_eq!(voice.next_sample(), tone.samples()[0]);
        assert_eq!(voice.next_sample(), tone.samples()[1]);
    }

    #[test]
    fn test_double_output_rate_takes_twice_the_frames() {
        let tone = Arc::new(synthesize(TickSoundType::Digital));
        let (mut voice, _retired) = voice_with_returns(SAMPLE_RATE * 2);
        voice.trigger(Arc::clone(&tone));

        let mut frames = 0;
        while voice.is_active() {
            voice.next_sample();
            frames += 1;
        }
        // 2 frames per source sample, plus the frame that detects the end
        assert_eq!(frames, tone.len() * 2 + 1);
    }

    #[test]
    fn test_drain_keeps_newest_buffer() {
        let (mut producer, mut consumer) = rtrb::RingBuffer::new(4);
        producer.push(Arc::new(synthesize(TickSoundType::Classic))).unwrap();
        producer.push(Arc::new(synthesize(TickSoundType::Wooden))).unwrap();

        let (mut voice, _retired) = voice_with_returns(SAMPLE_RATE);
        voice.drain(&mut consumer);

        let wooden = synthesize(TickSoundType::Wooden);
        voice.next_sample();
        assert_eq!(voice.next_sample(), wooden.samples()[1]);
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_replaced_and_finished_buffers_are_handed_back() {
        let (mut voice, mut retired) = voice_with_returns(SAMPLE_RATE);
        let classic = Arc::new(synthesize(TickSoundType::Classic));
        let digital = Arc::new(synthesize(TickSoundType::Digital));

        voice.trigger(Arc::clone(&classic));
        voice.trigger(Arc::clone(&digital));
        // the voice no longer holds classic; the return queue does
        assert_eq!(Arc::strong_count(&classic), 2);
        assert_eq!(retired.slots(), 1);

        while voice.is_active() {
            voice.next_sample();
        }
        assert_eq!(Arc::strong_count(&digital), 2);

        assert_eq!(release_retired(&mut retired), 2);
        assert_eq!(Arc::strong_count(&classic), 1);
        assert_eq!(Arc::strong_count(&digital), 1);
    }
}
