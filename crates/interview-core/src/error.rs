use thiserror::Error;

/// Error kinds surfaced across the interview engine (spec §7).
///
/// Collaborators never throw across a session task boundary except as one
/// of these typed variants — persistence and TTS failures are caught and
/// logged by their callers rather than propagated as `InterviewError`.
#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("upstream provider rate-limited, retry after {retry_after_ms}ms")]
    UpstreamRateLimited { retry_after_ms: u64 },

    #[error("upstream provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream provider returned a bad response: {0}")]
    UpstreamBadResponse(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl InterviewError {
    /// Short error code string, used both in WS `{type: error}` frames and
    /// as a key for the HTTP status mapping below.
    pub fn code(&self) -> &'static str {
        match self {
            InterviewError::AuthFailed(_) => "auth_failed",
            InterviewError::NotFound(_) => "not_found",
            InterviewError::Forbidden(_) => "forbidden",
            InterviewError::Validation(_) => "validation",
            InterviewError::UpstreamRateLimited { .. } => "upstream_rate_limited",
            InterviewError::UpstreamUnavailable(_) => "upstream_unavailable",
            InterviewError::UpstreamBadResponse(_) => "upstream_bad_response",
            InterviewError::Transport(_) => "transport",
            InterviewError::Config(_) => "internal",
            InterviewError::Internal(_) => "internal",
        }
    }

    /// HTTP status convention from spec.md §6.
    pub fn http_status(&self) -> u16 {
        match self {
            InterviewError::AuthFailed(_) => 401,
            InterviewError::NotFound(_) => 404,
            InterviewError::Forbidden(_) => 403,
            InterviewError::Validation(_) => 400,
            InterviewError::UpstreamRateLimited { .. } => 429,
            InterviewError::UpstreamUnavailable(_) | InterviewError::UpstreamBadResponse(_) => 502,
            InterviewError::Transport(_) => 502,
            InterviewError::Config(_) | InterviewError::Internal(_) => 500,
        }
    }

    /// Message safe to hand to a client: credential/prompt-bearing errors are
    /// collapsed to a generic string (§7 Surfacing).
    pub fn sanitized_message(&self) -> String {
        let raw = self.to_string();
        crate::sanitize::sanitize_for_client(&raw)
    }
}

pub type Result<T> = std::result::Result<T, InterviewError>;
