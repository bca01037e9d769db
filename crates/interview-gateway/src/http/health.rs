//! Liveness probe (spec §6). Grounded on the teacher's `health_handler`
//! shape, trimmed to what this gateway actually has to report: the teacher's
//! agent-health/git-sha/protocol fields have no counterpart here. Extended
//! with provider pool stats (`ProviderPool::stats`), the one field this
//! gateway adds beyond the teacher's payload.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use interview_protocol::http::HealthResponse;

use crate::app::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let pools = serde_json::to_value(state.pool.stats()).unwrap_or(serde_json::Value::Null);
    Json(HealthResponse::new(pools))
}
