// WAV export - persist rendered ticks as playable files
//
// Platform players that only accept files (AVAudioPlayer-style APIs) are fed
// from here: 32-bit float, mono, 44.1kHz.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::tone::ToneBuffer;
use crate::error::AudioError;

static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn wav_spec(buffer: &ToneBuffer) -> hound::WavSpec {
    hound::WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    }
}

/// Write `buffer` to `path` as a 32-bit float WAV file
///
/// # Errors
/// Returns `AudioError::ExportFailed` if the file cannot be created or written
pub fn write_wav<P: AsRef<Path>>(buffer: &ToneBuffer, path: P) -> Result<(), AudioError> {
    let path = path.as_ref();
    let mut writer = hound::WavWriter::create(path, wav_spec(buffer)).map_err(|err| {
        AudioError::ExportFailed {
            reason: format!("creating {}: {}", path.display(), err),
        }
    })?;

    for &sample in buffer.samples() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    log::debug!(
        "[ToneExport] Wrote {} tick ({} samples) to {}",
        buffer.sound(),
        buffer.len(),
        path.display()
    );
    Ok(())
}

/// Write `buffer` to a fresh file in the system temp directory
///
/// # Returns
/// Path of the written file
pub fn write_temp_wav(buffer: &ToneBuffer) -> Result<PathBuf, AudioError> {
    let index = TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "mindset-tick-{}-{}-{}.wav",
        buffer.sound(),
        std::process::id(),
        index
    ));
    write_wav(buffer, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{synthesize, TickSoundType};

    #[test]
    fn test_written_file_reads_back_identically() {
        let tone = synthesize(TickSoundType::Accent);
        let path = write_temp_wav(&tone).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);

        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.as_slice(), tone.samples());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_temp_files_do_not_collide() {
        let tone = synthesize(TickSoundType::Digital);
        let first = write_temp_wav(&tone).unwrap();
        let second = write_temp_wav(&tone).unwrap();
        assert_ne!(first, second);

        let _ = std::fs::remove_file(first);
        let _ = std::fs::remove_file(second);
    }

    #[test]
    fn test_unwritable_path_reports_export_failure() {
        let tone = synthesize(TickSoundType::Classic);
        let path = std::env::temp_dir()
            .join("mindset-missing-dir")
            .join("nested")
            .join("tick.wav");

        match write_wav(&tone, &path) {
            Err(AudioError::ExportFailed { reason }) => assert!(reason.contains("tick.wav")),
            other => panic!("Expected ExportFailed, got {:?}", other),
        }
    }
}
