//! The conversational session loop
//!
//! One strictly sequential cycle per turn: listen, transcribe, decide,
//! speak. No failure in an external call ends the session; the only way
//! out is a spoken exit phrase.

use crate::config::Settings;
use crate::llm::ResponseGenerator;
use crate::voice::{
    AudioArtifact, Listened, ListenWindow, Player, Recorder, SAMPLE_RATE, SpeechToText,
    TextToSpeech, samples_to_wav,
};
use crate::Result;

/// Spoken once at startup
pub const GREETING: &str = "안녕하세요. AI 음성 비서입니다. 무엇을 도와드릴까요?";

/// Spoken when a turn produced no transcript
pub const REPROMPT: &str = "다시 한 번 말씀해 주세요.";

/// Spoken once before the session ends
pub const FAREWELL: &str = "감사합니다. 안녕히 계세요.";

/// Transcripts that end the session. Matched exactly: no trimming, no
/// normalization, no substring matching.
pub const EXIT_PHRASES: [&str; 4] = ["종료", "그만", "끝", "멈춰"];

/// What the loop does with one turn's transcript
#[derive(Debug, PartialEq, Eq)]
pub enum TurnAction<'a> {
    /// No transcript; ask the user to repeat
    Reprompt,
    /// Exit phrase; say goodbye and stop
    Farewell,
    /// Forward the transcript to response generation
    Respond(&'a str),
}

/// Decide the action for a turn's transcript
#[must_use]
pub fn classify_transcript(transcript: Option<&str>) -> TurnAction<'_> {
    match transcript {
        None => TurnAction::Reprompt,
        Some(text) if EXIT_PHRASES.contains(&text) => TurnAction::Farewell,
        Some(text) => TurnAction::Respond(text),
    }
}

/// A voice conversation session. Owns every device and service client
/// for its lifetime; constructed once at startup.
pub struct Session {
    settings: Settings,
    window: ListenWindow,
    recorder: Recorder,
    player: Player,
    stt: SpeechToText,
    tts: TextToSpeech,
    llm: ResponseGenerator,
}

impl Session {
    /// Construct a session from settings, opening both audio devices
    /// and validating service credentials.
    ///
    /// # Errors
    ///
    /// Returns error if a device cannot be opened or the API key is missing
    pub fn new(settings: Settings) -> Result<Self> {
        let window = ListenWindow {
            calibration: settings.calibration,
            wait_timeout: settings.listen_timeout,
            phrase_limit: settings.phrase_limit,
        };

        let recorder = Recorder::new()?;
        let player = Player::new()?;
        let stt = SpeechToText::new(
            &settings.api_base,
            &settings.api_key,
            &settings.stt_model,
            &settings.stt_language,
        )?;
        let tts = TextToSpeech::new(&settings.tts_host, &settings.tts_language)?;
        let llm = ResponseGenerator::new(&settings)?;

        Ok(Self {
            settings,
            window,
            recorder,
            player,
            stt,
            tts,
            llm,
        })
    }

    /// Run the conversation until an exit phrase is spoken
    ///
    /// # Errors
    ///
    /// Never returns an error from a turn; reserved for future fatal paths
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(exit_phrases = ?EXIT_PHRASES, "session started");

        self.speak(GREETING).await;

        loop {
            let transcript = self.next_transcript().await;

            match classify_transcript(transcript.as_deref()) {
                TurnAction::Reprompt => {
                    self.speak(REPROMPT).await;
                }
                TurnAction::Farewell => {
                    self.speak(FAREWELL).await;
                    break;
                }
                TurnAction::Respond(text) => {
                    let reply = self.llm.generate(text).await;
                    tracing::info!(reply = %reply, "reply generated");
                    self.speak(&reply).await;
                    tokio::time::sleep(self.settings.turn_pause).await;
                }
            }
        }

        tracing::info!("session ended");
        Ok(())
    }

    /// Capture and transcribe one utterance.
    ///
    /// Every failure mode — wait timeout, device error, unintelligible
    /// audio, recognition-service error — collapses to `None`; the loop
    /// re-prompts instead of crashing.
    async fn next_transcript(&mut self) -> Option<String> {
        let samples = match self.recorder.listen(&self.window) {
            Ok(Listened::Phrase(samples)) => samples,
            Ok(Listened::Timeout) => {
                tracing::info!("no speech before timeout");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "capture failed");
                return None;
            }
        };

        let wav = match samples_to_wav(&samples, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::warn!(error = %e, "WAV encoding failed");
                return None;
            }
        };

        match self.stt.transcribe(&wav).await {
            Ok(text) if text.trim().is_empty() => {
                tracing::info!("no intelligible speech in audio");
                None
            }
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                None
            }
        }
    }

    /// Synthesize and play text, degrading to silence on failure
    async fn speak(&mut self, text: &str) {
        if let Err(e) = self.say(text).await {
            tracing::warn!(error = %e, "speech output failed, continuing silently");
        }
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        tracing::debug!(text, "speaking");

        let mp3 = self.tts.synthesize(text).await?;
        if mp3.is_empty() {
            return Ok(());
        }

        let mut artifact = AudioArtifact::write(&mp3)?;
        let played = self.player.play_file(artifact.path());
        // Deleted here on the success and error paths alike; Drop
        // covers unwinding
        artifact.delete();
        played
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_transcript_reprompts() {
        assert_eq!(classify_transcript(None), TurnAction::Reprompt);
    }

    #[test]
    fn exact_exit_phrases_end_the_session() {
        for phrase in EXIT_PHRASES {
            assert_eq!(classify_transcript(Some(phrase)), TurnAction::Farewell);
        }
    }

    #[test]
    fn exit_phrase_match_is_exact() {
        // Substring, superset, and padded forms must NOT terminate
        assert_eq!(
            classify_transcript(Some("종료해줘")),
            TurnAction::Respond("종료해줘")
        );
        assert_eq!(
            classify_transcript(Some("제발 그만")),
            TurnAction::Respond("제발 그만")
        );
        assert_eq!(
            classify_transcript(Some(" 종료")),
            TurnAction::Respond(" 종료")
        );
        assert_eq!(
            classify_transcript(Some("끝!")),
            TurnAction::Respond("끝!")
        );
    }

    #[test]
    fn ordinary_transcript_is_forwarded_verbatim() {
        assert_eq!(
            classify_transcript(Some("오늘 날씨 어때")),
            TurnAction::Respond("오늘 날씨 어때")
        );
    }
}
