//! Text-to-speech (TTS) processing
//!
//! Synthesizes speech through the public `translate_tts` endpoint, which
//! returns MP3 and takes a language tag directly. Requests are capped at
//! 200 characters, so longer text is split at whitespace and the MP3
//! segments concatenated (frame-aligned MP3 concatenates cleanly).

use std::time::Duration;

use crate::{Error, Result};

/// Per-request character limit of the synthesis endpoint
const MAX_CHUNK_CHARS: usize = 200;

/// Browser-style user agent; the endpoint rejects the default one
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    host: String,
    language: String,
}

impl TextToSpeech {
    /// Create a new TTS instance
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(host: &str, language: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            language: language.to_string(),
        })
    }

    /// Synthesize text to MP3 bytes at normal speed
    ///
    /// Returns an empty buffer for empty input.
    ///
    /// # Errors
    ///
    /// Returns error if any chunk request fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = split_text(text, MAX_CHUNK_CHARS);
        let total = chunks.len();
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            tracing::debug!(idx, total, chars = chunk.chars().count(), "synthesizing chunk");
            audio.extend_from_slice(&self.fetch_chunk(chunk, idx, total).await?);
        }

        tracing::debug!(bytes = audio.len(), "synthesis complete");
        Ok(audio)
    }

    /// Fetch one MP3 segment from the synthesis endpoint
    async fn fetch_chunk(&self, chunk: &str, idx: usize, total: usize) -> Result<Vec<u8>> {
        let url = format!(
            "{}/translate_tts?ie=UTF-8&client=tw-ob&tl={}&total={}&idx={}&textlen={}&q={}",
            self.host,
            self.language,
            total,
            idx,
            chunk.chars().count(),
            urlencoding::encode(chunk),
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::error!(error = %e, "synthesis request failed");
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "synthesis API error");
            return Err(Error::Tts(format!("synthesis API error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Split text into whitespace-aligned chunks of at most `max_chars`
/// characters. Words longer than the limit are hard-split.
#[must_use]
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();

        if word_chars > max_chars {
            // Flush, then hard-split the oversized word
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            let cs: Vec<char> = word.chars().collect();
            for piece in cs.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_chars
        } else {
            word_chars + 1
        };

        if current_chars + needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(word);
        current_chars += word_chars;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_text("안녕하세요. AI 음성 비서입니다.", MAX_CHUNK_CHARS);
        assert_eq!(chunks, vec!["안녕하세요. AI 음성 비서입니다."]);
    }

    #[test]
    fn long_text_splits_at_whitespace() {
        let text = "하나 둘 셋 넷 다섯 여섯 일곱 여덟 아홉 열";
        let chunks = split_text(text, 10);

        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10, "chunk too long: {chunk}");
        }

        let rejoined = chunks.join(" ");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn oversized_word_is_hard_split() {
        let word = "가".repeat(25);
        let chunks = split_text(&word, 10);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), word);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("", MAX_CHUNK_CHARS).is_empty());
        assert!(split_text("   ", MAX_CHUNK_CHARS).is_empty());
    }
}
