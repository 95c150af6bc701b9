//! Audio capture from microphone

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use super::phrase::{DetectorState, PhraseDetector, rms_energy};
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// How often the listen loop drains the stream buffer
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of one listen window
#[derive(Debug)]
pub enum Listened {
    /// A complete phrase was captured
    Phrase(Vec<f32>),
    /// No speech began before the wait timeout elapsed
    Timeout,
}

/// Timing bounds for one listen window
#[derive(Debug, Clone, Copy)]
pub struct ListenWindow {
    /// Ambient-noise calibration duration
    pub calibration: Duration,
    /// How long to wait for speech to begin
    pub wait_timeout: Duration,
    /// Maximum phrase duration
    pub phrase_limit: Duration,
}

/// Trailing silence that ends a phrase
const TRAILING_SILENCE: Duration = Duration::from_millis(500);

/// Captures audio from the default input device
pub struct Recorder {
    #[allow(dead_code)]
    device: Device,
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl Recorder {
    /// Open the default input device at the capture rate
    ///
    /// # Errors
    ///
    /// Returns error if no device or no mono 16 kHz configuration exists
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable input config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            "recorder initialized"
        );

        Ok(Self {
            device,
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Start streaming samples into the shared buffer
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let config = self.config.clone();
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("capture started");
        Ok(())
    }

    /// Stop streaming and release the microphone
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("capture stopped");
        }
    }

    /// Get captured samples and clear the buffer
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Get captured samples without clearing
    #[must_use]
    pub fn peek_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    /// Clear the sample buffer
    pub fn clear_buffer(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    /// Capture one phrase bounded by the given window.
    ///
    /// Calibrates against ambient noise, then blocks until either a
    /// complete phrase is captured or the wait timeout elapses without
    /// speech. The microphone is held only for the duration of the call.
    ///
    /// # Errors
    ///
    /// Returns error if the input stream fails
    pub fn listen(&mut self, window: &ListenWindow) -> Result<Listened> {
        self.start()?;
        self.clear_buffer();

        std::thread::sleep(window.calibration);
        let ambient = self.take_buffer();
        let ambient_rms = rms_energy(&ambient);

        let mut detector = PhraseDetector::new(
            ambient_rms,
            duration_to_samples(window.wait_timeout),
            duration_to_samples(window.phrase_limit),
            duration_to_samples(TRAILING_SILENCE),
        );

        tracing::info!("listening");

        let outcome = loop {
            std::thread::sleep(POLL_INTERVAL);
            let chunk = self.take_buffer();

            if detector.push(&chunk) == DetectorState::Complete {
                break Listened::Phrase(detector.take_phrase());
            }
            if detector.timed_out() {
                break Listened::Timeout;
            }
        };

        self.stop();
        Ok(outcome)
    }
}

/// Convert a wall-clock duration to a sample count at the capture rate
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn duration_to_samples(d: Duration) -> usize {
    (d.as_secs_f64() * f64::from(SAMPLE_RATE)) as usize
}

/// Convert f32 samples to WAV bytes for the transcription API
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_to_samples_at_capture_rate() {
        assert_eq!(duration_to_samples(Duration::from_secs(1)), 16000);
        assert_eq!(duration_to_samples(Duration::from_millis(500)), 8000);
        assert_eq!(duration_to_samples(Duration::from_secs(10)), 160_000);
    }
}
