//! Central shared state for the gateway (spec §4.H, §6). Grounded on the
//! teacher's `AppState` (one struct holding every subsystem handle, built
//! once in `main` and passed as `Arc<AppState>` to every handler) and
//! `build_router`'s flat `Router::new().route(...).with_state(...)` shape.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use dashmap::DashMap;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use interview_core::config::EngineConfig;
use interview_providers::llm::{LlmGateway, LlmGatewayBuilder, RouteEntry, Task};
use interview_providers::openai::OpenAiProvider;
use interview_providers::pool::{LlmVendor, ProviderKind, ProviderPool};
use interview_providers::tts::TtsSynthesizer;
use interview_session::byok::SessionByokLookup;
use interview_session::cold::InMemoryColdStore;
use interview_session::hot::InMemoryHotStore;
use interview_session::SessionManager;

use crate::auth::{BearerPassthroughAuth, CandidateAuth};
use crate::ws::registry::ConnectionRegistry;

/// Everything a handler needs, built once in `main` (spec §4.H / §6).
pub struct AppState {
    pub config: EngineConfig,
    pub pool: Arc<ProviderPool>,
    pub llm: Arc<LlmGateway>,
    pub tts: Arc<TtsSynthesizer>,
    pub sessions: Arc<SessionManager>,
    pub auth: Arc<dyn CandidateAuth>,
    /// Live WebSocket connections, keyed by session id (spec §4.H reconnect semantics).
    pub ws_registry: ConnectionRegistry,
    /// Last question id delivered over the socket per session, so a
    /// reconnect can tell "nothing new to send" from "resend the question"
    /// (spec §4.H Resume).
    pub last_sent_questions: DashMap<String, String>,
    /// STT provider's bidirectional WebSocket endpoint (spec §4.C).
    pub stt_ws_url: String,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Self {
        let pool = Arc::new(ProviderPool::new());
        pool.configure(ProviderKind::Stt.pool_key(), config.providers.stt_keys.clone());
        pool.configure(ProviderKind::Tts.pool_key(), config.providers.tts_keys.clone());

        let hot = Arc::new(InMemoryHotStore::new());
        let cold = Arc::new(InMemoryColdStore::new());
        let sessions = Arc::new(SessionManager::new(hot, cold));
        let byok = Arc::new(SessionByokLookup::new(sessions.clone()));

        let mut builder = LlmGatewayBuilder::new(pool.clone()).byok(byok);
        for vendor in &config.providers.llm_vendors {
            let vendor_id: &'static str = Box::leak(vendor.id.clone().into_boxed_str());
            pool.configure(ProviderKind::Llm(LlmVendor(vendor_id)).pool_key(), vendor.api_keys.clone());
            let first_key = vendor.api_keys.first().cloned().unwrap_or_default();
            let provider = Arc::new(OpenAiProvider::new(vendor_id, first_key, Some(vendor.base_url.clone())));
            builder = builder.provider(vendor_id, provider);
        }
        for (task_key, route) in &config.providers.routing {
            let Some(task) = task_for_key(task_key) else {
                tracing::warn!(task_key, "unrecognised routing key in config, ignoring");
                continue;
            };
            let Some((vendor, model)) = split_route(route) else {
                tracing::warn!(route, "malformed routing entry, expected 'vendor:model'");
                continue;
            };
            let vendor: &'static str = Box::leak(vendor.to_string().into_boxed_str());
            builder = builder.route(task, RouteEntry { vendor, model: model.to_string(), fallback_vendor: None, fallback_model: None });
        }
        let llm = Arc::new(builder.build());

        // A single TTS/STT endpoint is assumed; real deployments may front
        // several vendors behind the pool the same way LLM routing does.
        let tts_base_url = std::env::var("INTERVIEW_TTS_URL").unwrap_or_else(|_| "https://api.tts.example/v1/synthesize".to_string());
        let tts = Arc::new(TtsSynthesizer::new(tts_base_url, pool.clone()));
        let stt_ws_url = std::env::var("INTERVIEW_STT_URL").unwrap_or_else(|_| "wss://api.stt.example/v1/listen".to_string());

        Self {
            config,
            pool,
            llm,
            tts,
            sessions,
            auth: Arc::new(BearerPassthroughAuth),
            ws_registry: ConnectionRegistry::new(),
            last_sent_questions: DashMap::new(),
            stt_ws_url,
        }
    }
}

fn task_for_key(key: &str) -> Option<Task> {
    match key {
        "question_generation" => Some(Task::QuestionGeneration),
        "answer_evaluation" => Some(Task::AnswerEvaluation),
        "report_generation" => Some(Task::ReportGeneration),
        "conversational_framing" => Some(Task::ConversationalFraming),
        _ => None,
    }
}

fn split_route(route: &str) -> Option<(&str, &str)> {
    route.split_once(':')
}

/// Assemble the full Axum router (spec §6 HTTP/WS surface).
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = if state.config.gateway.cors_allowed_origins.is_empty() {
        CorsLayer::new()
    } else {
        let origins: Vec<_> = state
            .config
            .gateway
            .cors_allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/interviews/start", post(crate::http::interviews::start_interview))
        .route("/interviews", get(crate::http::interviews::list_interviews))
        .route("/interviews/{id}", get(crate::http::interviews::interview_detail))
        .route("/interviews/{id}/answer", post(crate::http::interviews::submit_answer))
        .route("/interviews/{id}/end", post(crate::http::interviews::end_interview))
        .route("/interviews/{id}/report", get(crate::http::interviews::get_report))
        .route("/interviews/{id}/stt-token", get(crate::http::interviews::stt_token))
        .route("/ws/interview/{id}", get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_for_key_rejects_unknown() {
        assert!(task_for_key("made_up").is_none());
        assert!(matches!(task_for_key("report_generation"), Some(Task::ReportGeneration)));
    }

    #[test]
    fn split_route_requires_a_colon() {
        assert_eq!(split_route("vendor-x:small"), Some(("vendor-x", "small")));
        assert_eq!(split_route("no-colon-here"), None);
    }
}
