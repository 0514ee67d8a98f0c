//! Module for managing audio recording. There can only be one active
//! recording at a time; storage and downstream processing are not managed
//! here. Captured audio is encoded as WAV in memory, which every
//! transcription backend accepts directly.

use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Host, Sample};
use hound::WavWriter;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RecorderError {
    /// generic anyhow error
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    /// No recording device available
    #[error("no input device available")]
    NoInputDevice,
    /// Sample format not supported
    #[error("sample format not supported: {0}")]
    SampleFormatNotSupported(String),
    /// Build stream error
    #[error(transparent)]
    BuildStream(#[from] cpal::BuildStreamError),
}

type Result<T> = std::result::Result<T, RecorderError>;
type WavWriterHandle = Arc<Mutex<Option<WavWriter<MemoryWriter>>>>;

/// A finished recording: WAV bytes plus basic stats for logging and
/// discard decisions.
#[derive(Debug, Clone)]
pub struct Recording {
    data: Vec<u8>,
    samples: usize,
    duration: Duration,
}

impl Recording {
    pub fn new(data: Vec<u8>, samples: usize, sample_rate: u32, channels: u16) -> Self {
        let frames = samples / channels.max(1) as usize;
        let duration = Duration::from_secs_f64(frames as f64 / sample_rate.max(1) as f64);
        Self {
            data,
            samples,
            duration,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// A cheaply cloneable handle to the inner data that is being recorded. The
/// finalize method for the wav writer does not return the inner data, so we
/// store it behind an Arc<Mutex> to allow for cheap cloning and access to the
/// inner data.
#[derive(Clone)]
struct MemoryWriter {
    inner: Arc<Mutex<Cursor<Vec<u8>>>>,
}

impl MemoryWriter {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Cursor::new(Vec::with_capacity(8 * 1024)))),
        }
    }

    fn try_into_inner(self) -> Result<Vec<u8>> {
        // Attempt to own the inner arc
        let owned = Arc::try_unwrap(self.inner).map_err(|_| {
            RecorderError::Anyhow(anyhow!("Failed to unwrap inner Arc in MemoryWriter"))
        })?;
        // Extract the cursor, then the Vec
        Ok(owned.into_inner().into_inner())
    }
}

impl Seek for MemoryWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.lock().seek(pos)
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

pub struct Recorder {
    host: Host,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Start capturing from the default input device. `on_activity` is
    /// invoked once, from the audio thread, when the first non-silent buffer
    /// arrives; it must not block.
    pub fn start_recording(
        &self,
        on_activity: impl FnMut() + Send + 'static,
    ) -> Result<RecordingHandle> {
        let device = self
            .host
            .default_input_device()
            .ok_or(RecorderError::NoInputDevice)?;
        let config = device
            .default_input_config()
            .map_err(|_| RecorderError::NoInputDevice)?;

        info!(device_name = %device.name().unwrap_or_else(|_| "unknown".into()), config = ?config, "Recording from device");

        let spec = wav_spec_from_config(&config);

        let buffer = MemoryWriter::new();
        let writer =
            WavWriter::new(buffer.clone(), spec).map_err(|e| RecorderError::Anyhow(e.into()))?;
        let writer = Arc::new(Mutex::new(Some(writer)));

        // Run the input stream on a separate thread.
        let writer_2 = writer.clone();

        let err_fn = move |err| {
            error!("an error occurred on stream: {}", err);
        };

        let mut mic_active = false;
        let mut on_activity = on_activity;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config.into(),
                move |data: &[f32], _: &_| {
                    if !mic_active && db_fs(data) > MIN_DB {
                        mic_active = true;
                        on_activity();
                    }
                    write_input_data(data, &writer_2);
                },
                err_fn,
                None,
            )?,
            sample_format => {
                return Err(RecorderError::SampleFormatNotSupported(format!(
                    "{:?}",
                    sample_format
                )))
            }
        };

        stream
            .play()
            .map_err(|_| anyhow!("failed to play stream"))?;

        Ok(RecordingHandle {
            stream,
            writer,
            buffer: Some(buffer),
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        })
    }
}

/// Handle to the active recording. When dropped or finalized, the recording
/// will end. You must call `finish` to receive the data.
pub struct RecordingHandle {
    stream: cpal::Stream,
    writer: WavWriterHandle,
    // The buffer the data is being written to. Presence of this buffer
    // indicates if the recording has been finalized or not.
    buffer: Option<MemoryWriter>,
    sample_rate: u32,
    channels: u16,
}

impl RecordingHandle {
    pub fn finish(&mut self) -> Result<Option<Recording>> {
        if self.buffer.is_none() {
            return Ok(None);
        }
        info!("Ending recording.");
        let buffer = self.buffer.take().unwrap();
        // can not drop the stream because we have &mut self instead of self;
        // pause instead and ignore errors.
        self.stream.pause().ok();
        // Finalize the writer so it writes the proper framing information.
        let writer = self
            .writer
            .lock()
            .take()
            .ok_or_else(|| anyhow!("recording writer already finalized"))?;
        let samples = writer.len() as usize;
        writer
            .finalize()
            .map_err(|e| RecorderError::Anyhow(anyhow!("Failed to finalize writer: {}", e)))?;
        // Now that it has ended, we can grab out the actual data.
        let data = buffer.try_into_inner()?;
        Ok(Some(Recording::new(
            data,
            samples,
            self.sample_rate,
            self.channels,
        )))
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        if self.buffer.is_some() {
            if let Err(e) = self.finish() {
                error!("failed to finalize recording: {}", e);
            }
        }
    }
}

fn wav_spec_from_config(config: &cpal::SupportedStreamConfig) -> hound::WavSpec {
    hound::WavSpec {
        channels: config.channels(),
        sample_rate: config.sample_rate().0,
        bits_per_sample: (config.sample_format().sample_size() * 8) as _,
        sample_format: sample_format(config.sample_format()),
    }
}

fn sample_format(format: cpal::SampleFormat) -> hound::SampleFormat {
    if format.is_float() {
        hound::SampleFormat::Float
    } else {
        hound::SampleFormat::Int
    }
}

fn write_input_data(input: &[f32], writer: &WavWriterHandle) {
    if let Some(mut guard) = writer.try_lock() {
        if let Some(writer) = guard.as_mut() {
            for &sample in input.iter() {
                writer.write_sample(sample).ok();
            }
        }
    }
}

pub const MIN_DB: f32 = -96.0;

/// Convert a slice of f32 samples to dBFS.
pub fn db_fs(data: &[f32]) -> f32 {
    let max_sample = data
        .iter()
        .fold(f32::EQUILIBRIUM, |max, &sample| sample.abs().max(max));

    (20.0 * max_sample.log10()).clamp(MIN_DB, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_fs_silence_clamps_to_floor() {
        assert_eq!(db_fs(&[0.0; 64]), MIN_DB);
    }

    #[test]
    fn test_db_fs_full_scale_is_zero() {
        assert_eq!(db_fs(&[1.0, -1.0, 0.5]), 0.0);
    }

    #[test]
    fn test_db_fs_half_scale() {
        let db = db_fs(&[0.5]);
        assert!((db - (-6.02)).abs() < 0.01);
    }

    #[test]
    fn test_recording_duration_from_samples() {
        // 16000 mono samples at 16 kHz is one second.
        let recording = Recording::new(Vec::new(), 16_000, 16_000, 1);
        assert_eq!(recording.duration(), Duration::from_secs(1));

        // Stereo halves the frame count.
        let recording = Recording::new(Vec::new(), 16_000, 16_000, 2);
        assert_eq!(recording.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_recording_into_data() {
        let recording = Recording::new(vec![1, 2, 3], 3, 48_000, 1);
        assert_eq!(recording.samples(), 3);
        assert_eq!(recording.into_data(), vec![1, 2, 3]);
    }
}
