//! Phrase boundary detection
//!
//! Segments one spoken phrase out of a live sample stream using an
//! energy gate calibrated against ambient noise. Pure state machine, no
//! device access, so the capture timing contract is testable offline.

use super::capture::SAMPLE_RATE;

/// Energy floor below which calibration never lowers the speech gate
pub const MIN_ENERGY_THRESHOLD: f32 = 0.03;

/// Ambient RMS is scaled by this factor to form the speech gate
const AMBIENT_RATIO: f32 = 1.5;

/// Minimum accumulated speech for a phrase to count (0.3 s at 16 kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// State of the phrase detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// No speech yet; the wait-timeout clock is running
    Waiting,
    /// Speech detected, accumulating the phrase
    Capturing,
    /// Phrase ended (trailing silence or length cap reached)
    Complete,
}

/// Detects the boundaries of a single phrase
pub struct PhraseDetector {
    threshold: f32,
    wait_budget: usize,
    max_phrase: usize,
    trailing_silence: usize,
    state: DetectorState,
    waited: usize,
    silence_run: usize,
    phrase: Vec<f32>,
}

impl PhraseDetector {
    /// Create a detector for one listen window.
    ///
    /// `wait_budget`, `max_phrase` and `trailing_silence` are sample
    /// counts at the capture rate.
    #[must_use]
    pub fn new(
        ambient_rms: f32,
        wait_budget: usize,
        max_phrase: usize,
        trailing_silence: usize,
    ) -> Self {
        let threshold = (ambient_rms * AMBIENT_RATIO).max(MIN_ENERGY_THRESHOLD);

        tracing::debug!(ambient_rms, threshold, "phrase detector calibrated");

        Self {
            threshold,
            wait_budget,
            max_phrase,
            trailing_silence,
            state: DetectorState::Waiting,
            waited: 0,
            silence_run: 0,
            phrase: Vec::new(),
        }
    }

    /// Feed a chunk of samples and return the resulting state
    pub fn push(&mut self, samples: &[f32]) -> DetectorState {
        if samples.is_empty() || self.state == DetectorState::Complete {
            return self.state;
        }

        let is_speech = rms_energy(samples) > self.threshold;

        match self.state {
            DetectorState::Waiting => {
                if is_speech {
                    self.state = DetectorState::Capturing;
                    self.phrase.extend_from_slice(samples);
                    self.silence_run = 0;
                    tracing::trace!(samples = samples.len(), "speech started");
                } else {
                    self.waited += samples.len();
                }
            }
            DetectorState::Capturing => {
                self.phrase.extend_from_slice(samples);

                if is_speech {
                    self.silence_run = 0;
                } else {
                    self.silence_run += samples.len();
                }

                if self.phrase.len() >= self.max_phrase {
                    tracing::debug!(samples = self.phrase.len(), "phrase length cap reached");
                    self.state = DetectorState::Complete;
                } else if self.silence_run >= self.trailing_silence {
                    if self.phrase.len() - self.silence_run >= MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = self.phrase.len(), "phrase complete");
                        self.state = DetectorState::Complete;
                    } else {
                        // Too short to be a phrase; discard and keep waiting.
                        // The wait-timeout clock keeps its elapsed budget.
                        tracing::trace!("discarding sub-phrase blip");
                        self.phrase.clear();
                        self.silence_run = 0;
                        self.state = DetectorState::Waiting;
                    }
                }
            }
            DetectorState::Complete => {}
        }

        self.state
    }

    /// Whether the wait timeout elapsed without speech starting
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.state == DetectorState::Waiting && self.waited >= self.wait_budget
    }

    /// Take the accumulated phrase, clearing it
    pub fn take_phrase(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.phrase)
    }

    /// Current detector state
    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.state
    }

    /// The calibrated energy gate
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }
}

/// Convert a duration in seconds to a sample count at the capture rate
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn secs_to_samples(secs: f32) -> usize {
    (secs * SAMPLE_RATE as f32) as usize
}

/// RMS energy of a chunk of samples
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
