//! REST surface (spec §6): one module per resource, a shared error mapping,
//! and a small enum-to-wire-string helper reused across handlers.

pub mod health;
pub mod interviews;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use interview_core::error::InterviewError;
use interview_protocol::http::ErrorResponse;

/// Map a domain error onto its HTTP status + error body (spec §7).
pub(crate) fn error_response(e: InterviewError) -> (StatusCode, Json<ErrorResponse>) {
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::new(e.code(), e.sanitized_message())))
}

/// Render a `#[serde(rename_all = "snake_case")]` enum the same way it would
/// appear inside a JSON document, for DTOs that carry it as a bare string.
pub(crate) fn enum_str<T: Serialize>(v: &T) -> String {
    serde_json::to_value(v)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
