//! Module for managing microphone capture. There can only be one active
//! capture at a time; the caller owns the handle and decides what happens
//! to the finished bytes.
//!
//! Captured audio is assembled in memory as a WAV stream so a finished
//! capture can be handed straight to the submission pipeline without
//! touching disk.

use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Host, Sample};
use hound::{WavSpec, WavWriter};
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

pub type Result<T> = std::result::Result<T, RecorderError>;
type WavWriterHandle = Arc<Mutex<Option<WavWriter<MemoryWriter>>>>;

/// A cheaply cloneable handle to the inner data that is being recorded. The
/// finalize method for the wav writer does not return the inner data, so we
/// store it behind an Arc<Mutex> to allow for cheap cloning and access to the
/// inner data.
#[derive(Debug, Clone)]
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
        // Extract the Vec from the cursor
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

/// A finished capture: WAV bytes plus enough metadata to describe it.
///
/// A capture stopped immediately after starting yields a headers-only WAV
/// with zero samples; that is still a valid `Recording`.
#[derive(Debug, Clone)]
pub struct Recording {
    data: Vec<u8>,
    samples: u32,
    duration: Duration,
}

impl Recording {
    pub fn new(data: Vec<u8>, samples: u32, duration: Duration) -> Self {
        Self {
            data,
            samples,
            duration,
        }
    }

    /// The assembled WAV bytes, in capture order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Total samples written across all channels.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Seam between the panel and the device-backed capture, so session
/// handling can be exercised without a microphone.
pub trait CaptureHandle: Send {
    /// Stop the capture and hand back the recorded audio. Returns
    /// `Ok(None)` when the capture was already finished; calling this
    /// again is always safe.
    fn finish(&mut self) -> Result<Option<Recording>>;
}

pub struct Recorder {
    host: Host,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Open the default input device and start buffering samples.
    ///
    /// Fails when no device is available or access is refused; the caller
    /// reports that and stays out of the recording state.
    pub fn start_recording(&self) -> Result<RecordingHandle> {
        let device = self
            .host
            .default_input_device()
            .ok_or(RecorderError::NoInputDevice)?;
        let config = device
            .default_input_config()
            .map_err(|_| RecorderError::NoInputDevice)?;

        info!(device_name = %device.name().unwrap_or_else(|_| "unknown".to_string()), "Recording from device");

        let spec = wav_spec_from_config(&config);

        let buffer = MemoryWriter::new();
        let writer =
            WavWriter::new(buffer.clone(), spec).map_err(|e| RecorderError::Anyhow(e.into()))?;
        let writer = Arc::new(Mutex::new(Some(writer)));

        // The input stream delivers data on its own thread; samples are
        // appended in arrival order, which defines the final audio order.
        let writer_2 = writer.clone();

        let err_fn = move |err| {
            error!("an error occurred on stream: {}", err);
        };

        let stream = match config.sample_format() {
            cpal::SampleFormat::I8 => device.build_input_stream(
                &config.into(),
                move |data, _: &_| write_input_data::<i8, i8>(data, &writer_2),
                err_fn,
                None,
            )?,
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config.into(),
                move |data, _: &_| write_input_data::<i16, i16>(data, &writer_2),
                err_fn,
                None,
            )?,
            cpal::SampleFormat::I32 => device.build_input_stream(
                &config.into(),
                move |data, _: &_| write_input_data::<i32, i32>(data, &writer_2),
                err_fn,
                None,
            )?,
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config.into(),
                move |data, _: &_| write_input_data::<f32, f32>(data, &writer_2),
                err_fn,
                None,
            )?,
            sample_format => {
                return Err(RecorderError::SampleFormatNotSupported(format!(
                    "{:?}",
                    sample_format
                )));
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

/// Handle to the active capture. Dropping it releases the stream and
/// discards the audio; call `finish` to receive the data.
pub struct RecordingHandle {
    stream: cpal::Stream,
    writer: WavWriterHandle,
    // The buffer the data is being written to. Presence of this buffer
    // indicates if the capture has been finalized or not.
    buffer: Option<MemoryWriter>,
    sample_rate: u32,
    channels: u16,
}

impl CaptureHandle for RecordingHandle {
    fn finish(&mut self) -> Result<Option<Recording>> {
        let Some(buffer) = self.buffer.take() else {
            return Ok(None);
        };
        // The stream cannot be dropped through &mut self; pause it and
        // ignore errors.
        self.stream.pause().ok();
        // Finalize the writer so it writes the proper framing information.
        let writer = self
            .writer
            .lock()
            .take()
            .ok_or_else(|| anyhow!("recording writer already taken"))?;
        let samples = writer.len();
        writer
            .finalize()
            .map_err(|e| RecorderError::Anyhow(anyhow!("Failed to finalize writer: {}", e)))?;
        // Now that it has ended, we can grab out the actual data.
        let data = buffer.try_into_inner()?;
        let frames = samples / u32::from(self.channels.max(1));
        let duration = Duration::from_secs_f64(f64::from(frames) / f64::from(self.sample_rate.max(1)));
        Ok(Some(Recording::new(data, samples, duration)))
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

fn wav_spec_from_config(config: &cpal::SupportedStreamConfig) -> WavSpec {
    WavSpec {
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

fn write_input_data<T, U>(input: &[T], writer: &WavWriterHandle)
where
    T: Sample,
    U: Sample + hound::Sample + FromSample<T>,
{
    if let Some(mut guard) = writer.try_lock() {
        if let Some(writer) = guard.as_mut() {
            for &sample in input.iter() {
                let sample: U = U::from_sample(sample);
                writer.write_sample(sample).ok();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_spec() -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[test]
    fn test_memory_writer_assembles_wav() {
        let buffer = MemoryWriter::new();
        let mut writer = WavWriter::new(buffer.clone(), test_spec()).unwrap();
        for i in 0..160i16 {
            writer.write_sample(i).unwrap();
        }
        let samples = writer.len();
        writer.finalize().unwrap();

        let data = buffer.try_into_inner().unwrap();
        assert_eq!(samples, 160);
        assert_eq!(&data[..4], b"RIFF");
        assert_eq!(&data[8..12], b"WAVE");
        // Header plus 160 16-bit samples.
        assert_eq!(data.len(), 44 + 160 * 2);
    }

    #[test]
    fn test_empty_capture_is_a_valid_wav() {
        let buffer = MemoryWriter::new();
        let writer = WavWriter::new(buffer.clone(), test_spec()).unwrap();
        assert_eq!(writer.len(), 0);
        writer.finalize().unwrap();

        let data = buffer.try_into_inner().unwrap();
        assert_eq!(&data[..4], b"RIFF");
        assert_eq!(data.len(), 44);
    }

    #[test]
    fn test_recording_metadata() {
        let recording = Recording::new(vec![0; 44], 16_000, Duration::from_secs(1));
        assert_eq!(recording.samples(), 16_000);
        assert_eq!(recording.duration(), Duration::from_secs(1));
        assert_eq!(recording.data().len(), 44);
        assert_eq!(recording.into_data().len(), 44);
    }
}
