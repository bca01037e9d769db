//! REST DTOs for the HTTP surface (spec §6). Field names mirror the spec's
//! request/response shapes exactly since these are an external contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct StartInterviewRequest {
    pub user_id: String,
    pub role: String,
    #[serde(default)]
    pub resume_id: Option<String>,
    #[serde(default)]
    pub resume_data: Option<Value>,
    #[serde(default)]
    pub experience_level: Option<String>,
    /// Bring-your-own-key override (spec §4.B), persisted to
    /// `session:<id>:byok` and bypassing the shared pool.
    #[serde(default)]
    pub byok_openrouter_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartInterviewResponse {
    pub interview_id: String,
    pub first_question: Value,
    pub estimated_duration: i64,
    pub skill_weights: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswerRequest {
    pub answer: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub phase: String,
    pub total_questions: u32,
    pub max_questions: u32,
    pub difficulty: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitAnswerResponse {
    pub evaluation: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<Value>,
    pub progress: Progress,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndInterviewResponse {
    pub session_id: String,
    pub status: String,
    pub report_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewSummary {
    pub session_id: String,
    pub role: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListInterviewsResponse {
    pub interviews: Vec<InterviewSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewDetailResponse {
    pub session_id: String,
    pub status: String,
    pub phase: String,
    pub flow_state: String,
    pub total_questions: u32,
    pub max_questions: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse {
    pub session_id: String,
    pub report: Value,
    /// Set when the session is still in progress and the report was
    /// generated on demand from a partial transcript (spec §6).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SttTokenResponse {
    /// Short-lived token the client uses to open the browser-side STT socket
    /// directly with the upstream vendor, where supported.
    pub token: String,
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Provider pool stats keyed by pool (`stt`, `tts`, `llm:<vendor>`),
    /// extending the teacher's health payload with the pool accounting
    /// `pool_manager.py::get_pool_stats` originally exposed.
    pub pools: Value,
}

impl HealthResponse {
    pub fn new(pools: Value) -> Self {
        Self { status: "ok", version: env!("CARGO_PKG_VERSION"), pools }
    }
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

/// Error body shared by every non-2xx HTTP response (spec §7).
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { error: ErrorBody { code: code.into(), message: message.into() } }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_parses_minimal_body() {
        let json = r#"{"user_id":"cand-1","role":"backend engineer"}"#;
        let req: StartInterviewRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.user_id, "cand-1");
        assert!(req.byok_openrouter_key.is_none());
    }

    #[test]
    fn error_response_shape() {
        let resp = ErrorResponse::new("not_found", "session does not exist");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"code\":\"not_found\""));
    }
}
