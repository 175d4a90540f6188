//! Oboe-based audio output for Android
//!
//! The stream is opened at the tick sample rate so the voice never
//! resamples. Like the desktop output, the stream is owned by a dedicated
//! thread and fed through an rtrb queue.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use ::oboe::{
    AudioOutputCallback, AudioOutputStreamSafe, AudioStream, AudioStreamAsync, AudioStreamBuilder,
    DataCallbackResult, Output, PerformanceMode, SharingMode,
};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::config::AudioConfig;
use crate::error::AudioError;
use crate::synth::{ToneBuffer, SAMPLE_RATE};

use super::voice::{release_retired, return_queue};
use super::{AudioOutput, ToneVoice};

/// Real-time callback: drain the queue, render the voice
///
/// No allocation, no locks, bounded work per frame.
struct TickCallback {
    queue: Consumer<Arc<ToneBuffer>>,
    voice: ToneVoice,
}

impl AudioOutputCallback for TickCallback {
    type FrameType = (f32, ::oboe::Mono);

    fn on_audio_ready(
        &mut self,
        _stream: &mut dyn AudioOutputStreamSafe,
        frames: &mut [f32],
    ) -> DataCallbackResult {
        self.voice.drain(&mut self.queue);
        for sample in frames.iter_mut() {
            *sample = self.voice.next_sample();
        }
        DataCallbackResult::Continue
    }
}

fn open_stream(
    queue: Consumer<Arc<ToneBuffer>>,
    retired: Producer<Arc<ToneBuffer>>,
) -> Result<AudioStreamAsync<Output, TickCallback>, AudioError> {
    let callback = TickCallback {
        queue,
        voice: ToneVoice::new(SAMPLE_RATE, retired),
    };

    AudioStreamBuilder::default()
        .set_performance_mode(PerformanceMode::LowLatency)
        .set_sharing_mode(SharingMode::Exclusive)
        .set_direction::<Output>()
        .set_sample_rate(SAMPLE_RATE as i32)
        .set_channel_count::<::oboe::Mono>()
        .set_format::<f32>()
        .set_callback(callback)
        .open_stream()
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Output stream: {:?}", e),
        })
}

/// Android output stream that plays queued ticks
pub struct OboeOutput {
    producer: Mutex<Producer<Arc<ToneBuffer>>>,
    /// Buffers the callback is done with, dropped on the caller's thread
    retired: Mutex<Consumer<Arc<ToneBuffer>>>,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl OboeOutput {
    /// Open and start a low-latency mono output stream
    pub fn open(config: &AudioConfig) -> Result<Self, AudioError> {
        let (producer, consumer) = RingBuffer::new(config.output_queue_capacity.max(1));
        let (retired_tx, retired_rx) = return_queue(config.output_queue_capacity);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), AudioError>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let worker = std::thread::Builder::new()
            .name("mindset-oboe-output".to_string())
            .spawn(move || {
                let mut stream = match open_stream(consumer, retired_tx) {
                    Ok(stream) => stream,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                if let Err(e) = stream.start() {
                    let _ = ready_tx.send(Err(AudioError::HardwareError {
                        details: format!("Failed to start output stream: {:?}", e),
                    }));
                    return;
                }

                let _ = ready_tx.send(Ok(()));
                let _ = shutdown_rx.recv();
                let _ = stream.stop();
            })?;

        match ready_rx.recv() {
            Ok(result) => result?,
            Err(_) => {
                let _ = worker.join();
                return Err(AudioError::StreamOpenFailed {
                    reason: "output thread exited before opening a stream".to_string(),
                });
            }
        }

        log::info!("[OboeOutput] Output stream running at {} Hz", SAMPLE_RATE);

        Ok(Self {
            producer: Mutex::new(producer),
            retired: Mutex::new(retired_rx),
            shutdown: Mutex::new(Some(shutdown_tx)),
            worker: Mutex::new(Some(worker)),
        })
    }
}

impl AudioOutput for OboeOutput {
    fn play_immediate(&self, buffer: &Arc<ToneBuffer>) -> Result<(), AudioError> {
        if let Ok(mut retired) = self.retired.lock() {
            release_retired(&mut retired);
        }

        let mut producer = self.producer.lock().map_err(|_| AudioError::LockPoisoned {
            component: "oboe_output".to_string(),
        })?;

        producer
            .push(Arc::clone(buffer))
            .map_err(|_| AudioError::PlaybackUnavailable {
                reason: "output queue is full".to_string(),
            })
    }

    fn name(&self) -> &'static str {
        "oboe"
    }
}

impl Drop for OboeOutput {
    fn drop(&mut self) {
        if let Ok(mut shutdown) = self.shutdown.lock() {
            shutdown.take();
        }
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(handle) = worker.take() {
                let _ = handle.join();
            }
        }
    }
}
