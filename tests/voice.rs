//! Voice pipeline integration tests
//!
//! Exercises the pipeline without audio hardware or live services.

use std::io::Cursor;

use sori::llm::{FALLBACK_REPLY, ResponseGenerator};
use sori::session::{EXIT_PHRASES, FAREWELL, GREETING, REPROMPT, TurnAction, classify_transcript};
use sori::voice::{
    AudioArtifact, DetectorState, PhraseDetector, SAMPLE_RATE, SpeechToText, samples_to_wav,
    secs_to_samples, split_text,
};
use sori::Settings;

/// Generate sine wave audio samples
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Generate silence
fn generate_silence(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    vec![0.0; num_samples]
}

/// Detector with the session's timing contract: 5 s wait, 10 s phrase
/// cap, 0.5 s trailing silence, quiet ambient floor
fn session_detector() -> PhraseDetector {
    PhraseDetector::new(
        0.0,
        secs_to_samples(5.0),
        secs_to_samples(10.0),
        secs_to_samples(0.5),
    )
}

#[test]
fn silence_never_completes_a_phrase() {
    let mut detector = session_detector();

    for _ in 0..10 {
        let state = detector.push(&generate_silence(0.4));
        assert_ne!(state, DetectorState::Complete);
    }
}

#[test]
fn wait_timeout_elapses_on_silence() {
    let mut detector = session_detector();

    // 4.8 s of silence: not yet timed out
    detector.push(&generate_silence(4.8));
    assert!(!detector.timed_out());

    // past 5 s: timed out, still waiting
    detector.push(&generate_silence(0.4));
    assert!(detector.timed_out());
    assert_eq!(detector.state(), DetectorState::Waiting);
}

#[test]
fn speech_then_silence_completes_phrase() {
    let mut detector = session_detector();

    let speech = generate_sine_samples(440.0, 1.0, 0.3);
    assert_eq!(detector.push(&speech), DetectorState::Capturing);

    let state = detector.push(&generate_silence(0.6));
    assert_eq!(state, DetectorState::Complete);

    let phrase = detector.take_phrase();
    assert!(phrase.len() >= speech.len());
}

#[test]
fn speech_pending_timeout_does_not_fire() {
    let mut detector = session_detector();

    // Speech begins just before the wait budget elapses
    detector.push(&generate_silence(4.9));
    detector.push(&generate_sine_samples(440.0, 1.0, 0.3));

    assert_eq!(detector.state(), DetectorState::Capturing);
    assert!(!detector.timed_out());
}

#[test]
fn phrase_length_cap_ends_capture() {
    let mut detector = session_detector();

    // Continuous speech with no trailing silence: the 10 s cap must end it
    let mut state = DetectorState::Waiting;
    for _ in 0..25 {
        state = detector.push(&generate_sine_samples(440.0, 0.5, 0.3));
        if state == DetectorState::Complete {
            break;
        }
    }

    assert_eq!(state, DetectorState::Complete);
    let phrase = detector.take_phrase();
    assert!(phrase.len() >= secs_to_samples(10.0));
}

#[test]
fn sub_phrase_blip_is_discarded() {
    let mut detector = session_detector();

    // A 0.1 s blip is under the minimum speech length
    detector.push(&generate_sine_samples(440.0, 0.1, 0.3));
    assert_eq!(detector.state(), DetectorState::Capturing);

    let state = detector.push(&generate_silence(0.6));
    assert_eq!(state, DetectorState::Waiting);
    assert!(detector.take_phrase().is_empty());
}

#[test]
fn samples_to_wav_produces_riff_container() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav_data = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    assert_eq!(&wav_data[0..4], b"RIFF");
    assert_eq!(&wav_data[8..12], b"WAVE");
    assert!(wav_data.len() > 44);
}

#[test]
fn wav_roundtrip_preserves_format() {
    let original_samples: Vec<f32> = vec![0.0, 0.5, -0.5, 1.0, -1.0, 0.25];
    let wav_data = samples_to_wav(&original_samples, SAMPLE_RATE).unwrap();

    let cursor = Cursor::new(wav_data);
    let mut reader = hound::WavReader::new(cursor).unwrap();

    let spec = reader.spec();
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.channels, 1);

    let read_samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(read_samples.len(), original_samples.len());
}

#[test]
fn artifact_cleanup_is_guaranteed_and_idempotent() {
    let mut artifact = AudioArtifact::write(b"fake mp3 payload").unwrap();
    let path = artifact.path().to_path_buf();
    assert!(path.exists());

    artifact.delete();
    assert!(!path.exists());

    // Double delete, delete after external removal, drop after delete:
    // none of these may panic
    artifact.delete();
    drop(artifact);

    let mut vanished = AudioArtifact::write(b"x").unwrap();
    std::fs::remove_file(vanished.path()).unwrap();
    vanished.delete();
}

#[test]
fn artifact_is_deleted_on_drop() {
    let path = {
        let artifact = AudioArtifact::write(b"x").unwrap();
        artifact.path().to_path_buf()
    };
    assert!(!path.exists());
}

#[test]
fn every_exit_phrase_ends_the_session() {
    for phrase in EXIT_PHRASES {
        assert_eq!(classify_transcript(Some(phrase)), TurnAction::Farewell);
    }
}

#[test]
fn exit_matching_rejects_substrings_and_supersets() {
    for transcript in ["종료해줘", "이제 그만할래", "끝내자", " 멈춰", "종료."] {
        assert_eq!(
            classify_transcript(Some(transcript)),
            TurnAction::Respond(transcript),
            "{transcript:?} must not terminate the session"
        );
    }
}

#[test]
fn missing_transcript_maps_to_reprompt() {
    assert_eq!(classify_transcript(None), TurnAction::Reprompt);
}

#[test]
fn spoken_strings_are_fixed_and_nonempty() {
    assert!(!GREETING.is_empty());
    assert!(!REPROMPT.is_empty());
    assert!(!FAREWELL.is_empty());
    assert_eq!(REPROMPT, "다시 한 번 말씀해 주세요.");
}

#[test]
fn tts_chunking_respects_limit_and_preserves_words() {
    let sentence = "오늘 날씨 어때 ".repeat(40);
    let chunks = split_text(&sentence, 200);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 200);
    }
    assert_eq!(chunks.join(" "), sentence.trim());
}

#[tokio::test]
async fn generation_failure_degrades_to_fallback_verbatim() {
    // Nothing listens on this port; the request must fail fast and the
    // generator must swallow it
    let settings = Settings {
        api_key: "test-key".to_string(),
        api_base: "http://127.0.0.1:9".to_string(),
        ..Settings::default()
    };

    let generator = ResponseGenerator::new(&settings).unwrap();
    let reply = generator.generate("오늘 날씨 어때").await;

    assert_eq!(reply, FALLBACK_REPLY);
}

#[tokio::test]
async fn transcription_failure_is_a_typed_error() {
    let stt = SpeechToText::new("http://127.0.0.1:9", "test-key", "whisper-1", "ko").unwrap();

    let wav = samples_to_wav(&generate_silence(0.1), SAMPLE_RATE).unwrap();
    let result = stt.transcribe(&wav).await;

    assert!(result.is_err());
}
