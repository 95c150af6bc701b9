//! Voice pipeline
//!
//! Audio capture with phrase segmentation, transcription, synthesis,
//! and playback. The session loop in `crate::session` sequences these.

mod artifact;
mod capture;
mod phrase;
mod playback;
mod stt;
mod tts;

pub use artifact::AudioArtifact;
pub use capture::{Listened, ListenWindow, Recorder, SAMPLE_RATE, samples_to_wav};
pub use phrase::{DetectorState, MIN_ENERGY_THRESHOLD, PhraseDetector, rms_energy, secs_to_samples};
pub use playback::Player;
pub use stt::SpeechToText;
pub use tts::{TextToSpeech, split_text};
