//! Configuration for the sori assistant
//!
//! Settings are resolved in three layers: hard-coded defaults, an optional
//! `~/.config/sori/config.toml` overlay, then environment variables. The
//! file is partial — every field is optional.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default chat-completions / transcription API base URL
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default synthesis host (the service behind the `translate_tts` endpoint)
const DEFAULT_TTS_HOST: &str = "https://translate.google.com";

/// Resolved runtime settings, constructed once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    /// API credential for the transcription and chat services.
    /// Empty when `OPENAI_API_KEY` is unset; validated by the clients
    /// that need it.
    pub api_key: String,

    /// Base URL for the transcription and chat services
    pub api_base: String,

    /// Chat model identifier
    pub llm_model: String,

    /// Response length ceiling in tokens
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Transcription model identifier
    pub stt_model: String,

    /// Spoken-language tag sent with transcription requests (ISO-639-1)
    pub stt_language: String,

    /// Synthesis host
    pub tts_host: String,

    /// Synthesis language tag
    pub tts_language: String,

    /// How long to wait for speech to begin before giving up on a turn
    pub listen_timeout: Duration,

    /// Maximum length of one captured phrase
    pub phrase_limit: Duration,

    /// Ambient-noise calibration window at the start of each listen
    pub calibration: Duration,

    /// Pause between the end of playback and the next listen
    pub turn_pause: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            llm_model: "gpt-4.1".to_string(),
            max_tokens: 150,
            temperature: 0.7,
            stt_model: "whisper-1".to_string(),
            stt_language: "ko".to_string(),
            tts_host: DEFAULT_TTS_HOST.to_string(),
            tts_language: "ko".to_string(),
            listen_timeout: Duration::from_secs(5),
            phrase_limit: Duration::from_secs(10),
            calibration: Duration::from_millis(500),
            turn_pause: Duration::from_millis(500),
        }
    }
}

impl Settings {
    /// Load settings: defaults, then the optional TOML file, then env vars
    #[must_use]
    pub fn load() -> Self {
        let mut settings = Self::default();
        settings.apply_file(&load_settings_file());
        settings.apply_env();
        settings
    }

    fn apply_file(&mut self, fc: &SettingsFile) {
        if let Some(v) = &fc.api_key {
            self.api_key.clone_from(v);
        }
        if let Some(v) = &fc.api_base {
            self.api_base.clone_from(v);
        }
        if let Some(v) = &fc.llm.model {
            self.llm_model.clone_from(v);
        }
        if let Some(v) = fc.llm.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = fc.llm.temperature {
            self.temperature = v;
        }
        if let Some(v) = &fc.voice.stt_model {
            self.stt_model.clone_from(v);
        }
        if let Some(v) = &fc.voice.stt_language {
            self.stt_language.clone_from(v);
        }
        if let Some(v) = &fc.voice.tts_host {
            self.tts_host.clone_from(v);
        }
        if let Some(v) = &fc.voice.tts_language {
            self.tts_language.clone_from(v);
        }
        if let Some(v) = fc.voice.listen_timeout_secs {
            self.listen_timeout = Duration::from_secs(v);
        }
        if let Some(v) = fc.voice.phrase_limit_secs {
            self.phrase_limit = Duration::from_secs(v);
        }
        if let Some(v) = fc.voice.calibration_ms {
            self.calibration = Duration::from_millis(v);
        }
        if let Some(v) = fc.voice.turn_pause_ms {
            self.turn_pause = Duration::from_millis(v);
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            self.api_key = v;
        }
        if let Ok(v) = std::env::var("SORI_API_BASE") {
            self.api_base = v;
        }
        if let Ok(v) = std::env::var("SORI_LLM_MODEL") {
            self.llm_model = v;
        }
    }
}

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    /// API credential (env var takes precedence)
    #[serde(default)]
    api_key: Option<String>,

    /// Transcription/chat API base URL
    #[serde(default)]
    api_base: Option<String>,

    /// Language-model configuration
    #[serde(default)]
    llm: LlmFileSettings,

    /// Voice pipeline configuration
    #[serde(default)]
    voice: VoiceFileSettings,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
struct LlmFileSettings {
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

/// Voice pipeline configuration
#[derive(Debug, Default, Deserialize)]
struct VoiceFileSettings {
    stt_model: Option<String>,
    stt_language: Option<String>,
    tts_host: Option<String>,
    tts_language: Option<String>,
    listen_timeout_secs: Option<u64>,
    phrase_limit_secs: Option<u64>,
    calibration_ms: Option<u64>,
    turn_pause_ms: Option<u64>,
}

/// Load the TOML settings file, falling back to defaults on any failure
fn load_settings_file() -> SettingsFile {
    let Some(path) = settings_file_path() else {
        return SettingsFile::default();
    };

    if !path.exists() {
        return SettingsFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(file) => {
                tracing::info!(path = %path.display(), "loaded config file");
                file
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                SettingsFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read config file");
            SettingsFile::default()
        }
    }
}

/// Return the settings file path: `~/.config/sori/config.toml`
fn settings_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("sori").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_contract() {
        let s = Settings::default();
        assert_eq!(s.listen_timeout, Duration::from_secs(5));
        assert_eq!(s.phrase_limit, Duration::from_secs(10));
        assert_eq!(s.calibration, Duration::from_millis(500));
        assert_eq!(s.turn_pause, Duration::from_millis(500));
        assert_eq!(s.max_tokens, 150);
        assert!((s.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(s.stt_language, "ko");
        assert_eq!(s.tts_language, "ko");
    }

    #[test]
    fn file_overlay_is_partial() {
        let fc: SettingsFile = toml::from_str(
            r#"
            [llm]
            model = "gpt-4o-mini"

            [voice]
            listen_timeout_secs = 8
            "#,
        )
        .unwrap();

        let mut s = Settings::default();
        s.apply_file(&fc);

        assert_eq!(s.llm_model, "gpt-4o-mini");
        assert_eq!(s.listen_timeout, Duration::from_secs(8));
        // untouched fields keep their defaults
        assert_eq!(s.phrase_limit, Duration::from_secs(10));
        assert_eq!(s.stt_model, "whisper-1");
    }
}
