//! Fire-and-forget report generation (spec §4.I), shared by the REST
//! `/answer` handler and the WS turn pipeline — both hand back a
//! pre-allocated `report_id` immediately on natural completion without
//! blocking the response on an LLM round trip.

use std::sync::Arc;

use tracing::warn;

use interview_core::model::Session;

use crate::app::AppState;

pub fn spawn(state: Arc<AppState>, session: Session, report_id: String, ttl_buffer_secs: i64) {
    tokio::spawn(async move {
        let report = interview_orchestrator::generate_report(&state.llm, &session).await;
        let report_json = match serde_json::to_string(&report) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialise generated report");
                return;
            }
        };
        if let Err(e) = state.sessions.save_report(&session.id, &report_id, &report_json, ttl_buffer_secs).await {
            warn!(error = %e, "failed to persist generated report");
        }
    });
}
