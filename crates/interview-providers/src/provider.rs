//! Common shapes shared by every upstream vendor call (LLM, STT, TTS).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single text-generation request sent to an LLM vendor.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

/// Common interface for all LLM vendor clients.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, thiserror::Error, Clone)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("no healthy credentials available for this vendor")]
    PoolExhausted,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Http(e.to_string())
    }
}

impl From<ProviderError> for interview_core::error::InterviewError {
    fn from(e: ProviderError) -> Self {
        use interview_core::error::InterviewError;
        match e {
            ProviderError::RateLimited { retry_after_ms } => InterviewError::UpstreamRateLimited { retry_after_ms },
            ProviderError::Api { status, message } => InterviewError::UpstreamBadResponse(format!("{status}: {message}")),
            ProviderError::Parse(m) => InterviewError::UpstreamBadResponse(m),
            ProviderError::Http(m) => InterviewError::Transport(m),
            ProviderError::Unavailable(m) => InterviewError::UpstreamUnavailable(m),
            ProviderError::PoolExhausted => InterviewError::UpstreamUnavailable("provider pool exhausted".into()),
        }
    }
}
