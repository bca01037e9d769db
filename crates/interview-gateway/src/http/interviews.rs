//! Interview lifecycle REST handlers (spec §6). Grounded on the teacher's
//! `http::chat::chat_handler` shape: resolve auth, validate, delegate to the
//! domain layer, map errors through `error_response`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use tracing::warn;
use uuid::Uuid;

use interview_core::error::InterviewError;
use interview_core::model::{ExperienceLevel, FlowState, ResumeSnapshot, Session, SessionConfig, SessionId};
use interview_orchestrator::{generate_report, ingest_answer, select_initial_question};
use interview_protocol::http::{
    EndInterviewResponse, ErrorResponse, InterviewDetailResponse, InterviewSummary, ListInterviewsResponse, Progress,
    ReportResponse, StartInterviewRequest, StartInterviewResponse, SttTokenResponse, SubmitAnswerRequest, SubmitAnswerResponse,
};
use interview_selector::skill_weighting::calculate_skill_weights;

use crate::app::AppState;
use crate::http::{enum_str, error_response};

fn parse_experience_level(raw: &str) -> Option<ExperienceLevel> {
    match raw {
        "entry" => Some(ExperienceLevel::Entry),
        "mid" => Some(ExperienceLevel::Mid),
        "senior" => Some(ExperienceLevel::Senior),
        "executive" => Some(ExperienceLevel::Executive),
        _ => None,
    }
}

fn resume_from_value(value: Option<serde_json::Value>) -> ResumeSnapshot {
    value.and_then(|v| serde_json::from_value(v).ok()).unwrap_or_default()
}

/// Load a session and enforce that `candidate_id` owns it (spec §6 auth).
async fn load_owned_session(state: &AppState, candidate_id: &str, id: &str) -> Result<Session, InterviewError> {
    let session_id = SessionId(id.to_string());
    let session = state
        .sessions
        .load(&session_id, state.config.interview.hot_tier_ttl_buffer_secs)
        .await
        .map_err(|e| InterviewError::Internal(e.to_string()))?
        .ok_or_else(|| InterviewError::NotFound(format!("no interview with id {id}")))?;
    if session.candidate_id != candidate_id {
        return Err(InterviewError::Forbidden("this interview belongs to another candidate".to_string()));
    }
    Ok(session)
}

/// `POST /interviews/start` (spec §6, §4.E): creates a session, computes
/// skill weights, and serves the first question.
pub async fn start_interview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<StartInterviewRequest>,
) -> Result<(StatusCode, Json<StartInterviewResponse>), (StatusCode, Json<ErrorResponse>)> {
    let candidate_id = state.auth.resolve(&headers).map_err(error_response)?;
    if candidate_id != req.user_id {
        return Err(error_response(InterviewError::Forbidden(
            "authenticated identity does not match the requested user_id".to_string(),
        )));
    }

    let experience_level = req.experience_level.as_deref().and_then(parse_experience_level);
    let resume = resume_from_value(req.resume_data);

    let defaults = &state.config.interview;
    let config = SessionConfig {
        role: req.role.clone(),
        duration_minutes: defaults.duration_minutes,
        max_questions: defaults.max_questions,
        experience_level,
    };

    let mut session = Session::new(candidate_id, config, resume, defaults.sliding_window_size);
    session.skill_weights = calculate_skill_weights(&req.role, &session.resume);
    session.mark_started();

    let first_question = select_initial_question(&state.llm, &session).await;
    session.set_current_question(first_question.clone());
    session.flow_state = FlowState::AiSpeaking;

    if let Some(byok_key) = &req.byok_openrouter_key {
        let ttl_secs = ((defaults.duration_minutes * 60) + defaults.hot_tier_ttl_buffer_secs).max(3600) as u64;
        if let Err(e) = state.sessions.set_byok(&session.id, byok_key, Duration::from_secs(ttl_secs)).await {
            warn!(error = %e, "failed to persist BYOK credential");
        }
    }

    let skill_weights_json = serde_json::to_value(&session.skill_weights).unwrap_or_default();
    let session = state
        .sessions
        .create(session, defaults.hot_tier_ttl_buffer_secs)
        .await
        .map_err(|e| error_response(InterviewError::Internal(e.to_string())))?;

    Ok((
        StatusCode::CREATED,
        Json(StartInterviewResponse {
            interview_id: session.id.as_str().to_string(),
            first_question: serde_json::to_value(&first_question).unwrap_or_default(),
            estimated_duration: session.config.duration_minutes,
            skill_weights: skill_weights_json,
        }),
    ))
}

/// `POST /interviews/{id}/answer` (spec §4.G, §6): evaluate the answer,
/// advance the turn, and fire off report generation when it completes the
/// interview naturally.
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, (StatusCode, Json<ErrorResponse>)> {
    let candidate_id = state.auth.resolve(&headers).map_err(error_response)?;
    let mut session = load_owned_session(&state, &candidate_id, &id).await.map_err(error_response)?;

    let ttl_buffer = state.config.interview.hot_tier_ttl_buffer_secs;
    let outcome = ingest_answer(&state.sessions, &state.llm, &mut session, req.answer, req.code, None, ttl_buffer)
        .await
        .map_err(error_response)?;

    let report_id = if outcome.completed {
        let report_id = Uuid::new_v4().to_string();
        crate::report_task::spawn(state.clone(), session.clone(), report_id.clone(), ttl_buffer);
        Some(report_id)
    } else {
        None
    };

    Ok(Json(SubmitAnswerResponse {
        evaluation: serde_json::to_value(&outcome.evaluation).unwrap_or_default(),
        next_question: outcome.next_question.map(|q| serde_json::to_value(&q).unwrap_or_default()),
        progress: Progress {
            phase: enum_str(&session.phase),
            total_questions: session.total_questions,
            max_questions: session.config.max_questions,
            difficulty: session.difficulty,
        },
        completed: outcome.completed,
        report_id,
    }))
}

/// `POST /interviews/{id}/end` (spec §6): explicit early termination,
/// report generation is synchronous since the caller is waiting on it.
pub async fn end_interview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<EndInterviewResponse>, (StatusCode, Json<ErrorResponse>)> {
    let candidate_id = state.auth.resolve(&headers).map_err(error_response)?;
    let session = load_owned_session(&state, &candidate_id, &id).await.map_err(error_response)?;

    let ttl_buffer = state.config.interview.hot_tier_ttl_buffer_secs;
    let session = state
        .sessions
        .mark_completed(&session.id, ttl_buffer)
        .await
        .map_err(|e| error_response(InterviewError::Internal(e.to_string())))?
        .ok_or_else(|| error_response(InterviewError::NotFound(format!("no interview with id {id}"))))?;

    let report = generate_report(&state.llm, &session).await;
    let report_id = Uuid::new_v4().to_string();
    let report_json = serde_json::to_string(&report).map_err(|e| error_response(InterviewError::Internal(e.to_string())))?;
    state
        .sessions
        .save_report(&session.id, &report_id, &report_json, ttl_buffer)
        .await
        .map_err(|e| error_response(InterviewError::Internal(e.to_string())))?;

    state.ws_registry.close(session.id.as_str(), crate::ws::registry::CLOSE_GRACEFUL);

    Ok(Json(EndInterviewResponse {
        session_id: session.id.as_str().to_string(),
        status: enum_str(&session.status),
        report_id,
    }))
}

/// `GET /interviews` (spec §6): every interview ever started by the caller.
pub async fn list_interviews(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ListInterviewsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let candidate_id = state.auth.resolve(&headers).map_err(error_response)?;
    let ttl_buffer = state.config.interview.hot_tier_ttl_buffer_secs;
    let sessions = state
        .sessions
        .list_for_candidate(&candidate_id, ttl_buffer)
        .await
        .map_err(|e| error_response(InterviewError::Internal(e.to_string())))?;

    let interviews = sessions
        .into_iter()
        .map(|s| InterviewSummary {
            session_id: s.id.as_str().to_string(),
            role: s.config.role,
            status: enum_str(&s.status),
            started_at: s.started_at,
        })
        .collect();

    Ok(Json(ListInterviewsResponse { interviews }))
}

/// `GET /interviews/{id}` (spec §6): a point-in-time snapshot of progress.
pub async fn interview_detail(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<InterviewDetailResponse>, (StatusCode, Json<ErrorResponse>)> {
    let candidate_id = state.auth.resolve(&headers).map_err(error_response)?;
    let session = load_owned_session(&state, &candidate_id, &id).await.map_err(error_response)?;

    Ok(Json(InterviewDetailResponse {
        session_id: session.id.as_str().to_string(),
        status: enum_str(&session.status),
        phase: enum_str(&session.phase),
        flow_state: enum_str(&session.flow_state),
        total_questions: session.total_questions,
        max_questions: session.config.max_questions,
    }))
}

/// `GET /interviews/{id}/report` (spec §4.I, §6): the persisted report if the
/// interview completed, otherwise an on-the-fly partial one.
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, (StatusCode, Json<ErrorResponse>)> {
    let candidate_id = state.auth.resolve(&headers).map_err(error_response)?;
    let session = load_owned_session(&state, &candidate_id, &id).await.map_err(error_response)?;

    if let Some(report_id) = &session.report_id {
        if let Some(raw) = state
            .sessions
            .load_report(report_id)
            .await
            .map_err(|e| error_response(InterviewError::Internal(e.to_string())))?
        {
            let report: serde_json::Value =
                serde_json::from_str(&raw).map_err(|e| error_response(InterviewError::Internal(e.to_string())))?;
            return Ok(Json(ReportResponse { session_id: session.id.as_str().to_string(), report, partial: None }));
        }
    }

    let report = generate_report(&state.llm, &session).await;
    Ok(Json(ReportResponse {
        session_id: session.id.as_str().to_string(),
        report: serde_json::to_value(&report).unwrap_or_default(),
        partial: Some(true),
    }))
}

/// `GET /interviews/{id}/stt-token` (spec §4.C, §6): a short-lived STT
/// session token scoped to this interview. Out of scope per spec §1 beyond
/// this handoff point — real vendor token minting is an external
/// collaborator; here the candidate's own BYOK/provider key stands in.
pub async fn stt_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<SttTokenResponse>, (StatusCode, Json<ErrorResponse>)> {
    let candidate_id = state.auth.resolve(&headers).map_err(error_response)?;
    let _session = load_owned_session(&state, &candidate_id, &id).await.map_err(error_response)?;

    let handle = state
        .pool
        .acquire(&interview_providers::pool::ProviderKind::Stt.pool_key(), interview_providers::pool::AcquireStrategy::RoundRobin)
        .ok_or_else(|| error_response(InterviewError::UpstreamUnavailable("no STT provider keys configured".to_string())))?;

    Ok(Json(SttTokenResponse { token: handle.key().to_string(), expires_in_secs: 300 }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_experience_levels() {
        assert_eq!(parse_experience_level("senior"), Some(ExperienceLevel::Senior));
        assert_eq!(parse_experience_level("made_up"), None);
    }

    #[test]
    fn resume_from_value_defaults_on_missing() {
        assert!(resume_from_value(None).skills.is_empty());
    }
}
