//! Text completion boundary.
//!
//! The summarizer only ever talks to a [`TextCompletionPort`]. The bundled
//! [`ChatCompletionClient`] implements it against any OpenAI-compatible
//! chat-completions endpoint (Groq by default).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SummarizeOptions;
use crate::error::Error;

/// Default chat-completions endpoint.
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default model served by the default endpoint.
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Longest provider error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 1000;

/// Failure of a single completion call.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited by provider{}", retry_suffix(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),
}

fn retry_suffix(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout
        } else {
            CompletionError::Transport(e.to_string())
        }
    }
}

/// A remote text-in/text-out service.
#[async_trait]
pub trait TextCompletionPort: Send + Sync {
    /// Complete `prompt`, producing at most `max_tokens` tokens.
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for OpenAI-compatible chat completions.
pub struct ChatCompletionClient {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl ChatCompletionClient {
    pub fn new(
        api_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> crate::Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::MissingApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidOption(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            model: model.into(),
            api_key,
        })
    }

    /// Build a client from the endpoint, model, key and timeout in `options`.
    /// The key falls back to `GROQ_API_KEY`.
    pub fn from_options(options: &SummarizeOptions) -> crate::Result<Self> {
        let api_key = options.resolve_api_key().ok_or(Error::MissingApiKey)?;
        Self::new(
            options.api_url.clone(),
            options.model.clone(),
            api_key,
            options.request_timeout,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl TextCompletionPort for ChatCompletionClient {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, CompletionError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature,
        };

        debug!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            max_tokens,
            "requesting completion"
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let text = response.text().await?;

        parse_response(status, retry_after, &text)
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Turn a raw provider response into completion text or a classified error.
fn parse_response(
    status: StatusCode,
    retry_after: Option<u64>,
    body: &str,
) -> Result<String, CompletionError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(CompletionError::RateLimited { retry_after });
    }

    if !status.is_success() {
        return Err(CompletionError::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::InvalidResponse(format!("malformed JSON: {e}")))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::InvalidResponse("response has no choices".into()))?
        .message
        .content
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(CompletionError::InvalidResponse("empty completion".into()));
    }

    Ok(content)
}
