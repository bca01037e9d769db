//! OpenAI-compatible chat-completions client (spec §6 External providers —
//! LLM providers: HTTP request/response, model/messages/max_tokens/temperature).
//!
//! Any vendor reachable through an OpenAI-shaped `/v1/chat/completions`
//! endpoint can be wired up via [`OpenAiProvider::with_path`]; the LLM
//! Gateway (`crate::llm`) holds one of these per configured vendor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, Message, ProviderError, Role};

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    provider_name: String,
    chat_path: String,
}

impl OpenAiProvider {
    pub fn new(name: impl Into<String>, api_key: String, base_url: Option<String>) -> Self {
        Self::with_path(
            name,
            api_key,
            base_url.unwrap_or_else(|| "https://api.openai.com".to_string()),
            "/v1/chat/completions".to_string(),
        )
    }

    /// `base_url` should NOT include a trailing slash; `chat_path` should
    /// start with "/".
    pub fn with_path(name: impl Into<String>, api_key: String, base_url: String, chat_path: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            provider_name: name.into(),
            api_key,
            base_url,
            chat_path,
        }
    }
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    model: Option<String>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

fn role_str(role: &Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

fn build_request_body<'a>(req: &'a ChatRequest) -> ApiRequest<'a> {
    let mut messages = Vec::with_capacity(req.messages.len() + 1);
    messages.push(ApiMessage { role: "system", content: &req.system });
    for m in &req.messages {
        messages.push(ApiMessage { role: role_str(&m.role), content: &m.content });
    }
    ApiRequest { model: &req.model, messages, max_tokens: req.max_tokens, temperature: req.temperature }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = build_request_body(req);
        let url = format!("{}{}", self.base_url, self.chat_path);

        debug!(provider = %self.provider_name, model = %req.model, "sending chat-completion request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry_after_ms = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(60_000);
            return Err(ProviderError::RateLimited { retry_after_ms });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(provider = %self.provider_name, status, body = %text, "provider returned an error");
            return Err(ProviderError::Api { status, message: text });
        }

        let api_resp: ApiResponse = resp.json().await.map_err(|e| ProviderError::Parse(e.to_string()))?;
        let choice = api_resp.choices.into_iter().next().ok_or_else(|| ProviderError::Parse("empty choices array".into()))?;

        Ok(ChatResponse {
            content: choice.message.content,
            model: api_resp.model.unwrap_or_else(|| req.model.clone()),
            tokens_in: api_resp.usage.as_ref().and_then(|u| u.prompt_tokens).unwrap_or(0),
            tokens_out: api_resp.usage.as_ref().and_then(|u| u.completion_tokens).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_prepends_system_message() {
        let req = ChatRequest {
            model: "small".into(),
            system: "be concise".into(),
            messages: vec![Message { role: Role::User, content: "hi".into() }],
            max_tokens: 100,
            temperature: 0.5,
        };
        let body = build_request_body(&req);
        assert_eq!(body.messages[0].role, "system");
        assert_eq!(body.messages.len(), 2);
    }
}
