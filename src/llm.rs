//! Response generation via an external chat-completions service
//!
//! Each call is stateless: the request carries only the fixed persona
//! instruction and the current transcript, never prior turns.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::{Error, Result};

/// Fixed persona instruction sent with every request
pub const SYSTEM_INSTRUCTION: &str = "당신은 친절하고 도움이 되는 AI 어시스턴트입니다. \
     간결하고 명확하게 한국어로 답변해 주세요. 짧고 간단하게 문장으로 답변해주세요.";

/// Spoken when generation fails for any reason
pub const FALLBACK_REPLY: &str = "죄송합니다. 응답을 생성하는 중 오류가 발생했습니다.";

/// Generates replies to transcripts
pub struct ResponseGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ResponseGenerator {
    /// Create a new generator from settings
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or the client cannot be built
    pub fn new(settings: &Settings) -> Result<Self> {
        if settings.api_key.is_empty() {
            return Err(Error::Config(
                "API key required for response generation (set OPENAI_API_KEY)".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.api_base.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.llm_model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        })
    }

    /// Generate a reply for a transcript.
    ///
    /// Never fails: any service, network, or parse error is logged and
    /// degrades to [`FALLBACK_REPLY`], so the turn is always spoken.
    pub async fn generate(&self, transcript: &str) -> String {
        match self.request_completion(transcript).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "chat completion failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }

    async fn request_completion(&self, transcript: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_INSTRUCTION,
                },
                Message {
                    role: "user",
                    content: transcript,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("chat API error {status}: {body}")));
        }

        let result: ChatResponse = response.json().await?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| Error::Llm("chat response contained no text".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
