//! CPAL-based audio output for desktop platforms (Linux, macOS, Windows)
//!
//! `cpal::Stream` is not `Send` on every host, so the stream lives on a
//! dedicated thread for its whole life. The rest of the engine only touches
//! the rtrb producer feeding the device callback.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use ::cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::config::AudioConfig;
use crate::error::AudioError;
use crate::synth::ToneBuffer;

use super::voice::{release_retired, return_queue};
use super::{AudioOutput, ToneVoice};

/// Desktop output stream that plays queued ticks
pub struct CpalOutput {
    producer: Mutex<Producer<Arc<ToneBuffer>>>,
    /// Buffers the callback is done with, dropped on the caller's thread
    retired: Mutex<Consumer<Arc<ToneBuffer>>>,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    device_rate: u32,
}

impl CpalOutput {
    /// Open the default output device and start its stream
    ///
    /// # Errors
    /// - `StreamOpenFailed` if there is no device or it rejects the config
    /// - `HardwareError` if the stream cannot be started
    pub fn open(config: &AudioConfig) -> Result<Self, AudioError> {
        let (producer, consumer) = RingBuffer::new(config.output_queue_capacity.max(1));
        let (retired_tx, retired_rx) = return_queue(config.output_queue_capacity);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, AudioError>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let worker = std::thread::Builder::new()
            .name("mindset-cpal-output".to_string())
            .spawn(move || {
                let (stream, device_rate) = match build_output_stream(consumer, retired_tx) {
                    Ok(opened) => opened,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(AudioError::HardwareError {
                        details: format!("Output start failed: {}", e),
                    }));
                    return;
                }

                let _ = ready_tx.send(Ok(device_rate));
                // Park until the output is dropped; the stream stops with this thread
                let _ = shutdown_rx.recv();
                drop(stream);
            })?;

        let device_rate = match ready_rx.recv() {
            Ok(result) => result?,
            Err(_) => {
                let _ = worker.join();
                return Err(AudioError::StreamOpenFailed {
                    reason: "output thread exited before opening a stream".to_string(),
                });
            }
        };

        log::info!("[CpalOutput] Output stream running at {} Hz", device_rate);

        Ok(Self {
            producer: Mutex::new(producer),
            retired: Mutex::new(retired_rx),
            shutdown: Mutex::new(Some(shutdown_tx)),
            worker: Mutex::new(Some(worker)),
            device_rate,
        })
    }

    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }
}

fn build_output_stream(
    mut queue: Consumer<Arc<ToneBuffer>>,
    retired: Producer<Arc<ToneBuffer>>,
) -> Result<(::cpal::Stream, u32), AudioError> {
    let host = ::cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::StreamOpenFailed {
            reason: "No default output device found".to_string(),
        })?;

    let config = device
        .default_output_config()
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("Failed to get default output config: {:?}", e),
        })?;

    let stream_config: ::cpal::StreamConfig = config.clone().into();
    let channels_count = stream_config.channels as usize;
    let device_rate = stream_config.sample_rate.0;
    let mut voice = ToneVoice::new(device_rate, retired);

    let err_fn = |err| log::error!("[CpalOutput] Output stream error: {}", err);

    let stream = match config.sample_format() {
        ::cpal::SampleFormat::F32 => device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &::cpal::OutputCallbackInfo| {
                voice.drain(&mut queue);

                // Write the mono voice to all channels
                for frame in data.chunks_mut(channels_count) {
                    let sample = voice.next_sample();
                    for slot in frame.iter_mut() {
                        *slot = sample;
                    }
                }
            },
            err_fn,
            None,
        ),
        _ => {
            return Err(AudioError::StreamOpenFailed {
                reason: "Only F32 sample format is currently supported for output".to_string(),
            })
        }
    }
    .map_err(|e| AudioError::StreamOpenFailed {
        reason: format!("{:?}", e),
    })?;

    Ok((stream, device_rate))
}

impl AudioOutput for CpalOutput {
    fn play_immediate(&self, buffer: &Arc<ToneBuffer>) -> Result<(), AudioError> {
        if let Ok(mut retired) = self.retired.lock() {
            release_retired(&mut retired);
        }

        let mut producer = self.producer.lock().map_err(|_| AudioError::LockPoisoned {
            component: "cpal_output".to_string(),
        })?;

        producer
            .push(Arc::clone(buffer))
            .map_err(|_| AudioError::PlaybackUnavailable {
                reason: "output queue is full".to_string(),
            })
    }

    fn name(&self) -> &'static str {
        "cpal"
    }
}

impl Drop for CpalOutput {
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
