//! Chat-completion client used by the LLM mention analyzer.
//!
//! The analyzer only needs "send one prompt, get text back", so the seam is a
//! single-method trait. Tests substitute scripted clients for the network one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("API key not configured")]
    MissingKey,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout
        } else if e.is_decode() {
            CompletionError::InvalidResponse(e.to_string())
        } else {
            CompletionError::Network(e.to_string())
        }
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends `prompt` as a single user message and returns the reply text.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(COMPLETION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                error!(error = %e, "failed to build completion client, using default client");
                Client::new()
            });

        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        if self.api_key.is_empty() {
            return Err(CompletionError::MissingKey);
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        debug!(model = %self.model, "sending completion request");

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(CompletionError::RateLimited(body));
            }
            error!(status = %status, "completion API error: {}", body);
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatResponse = response.json().await?;
        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default())
    }
}
