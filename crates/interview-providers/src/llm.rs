//! LLM Gateway (spec §4.B): task→model routing, BYOK override, pooled
//! credentials, and cross-provider fallback on rate limit. Grounded on the
//! teacher's provider-router fallback chain (`interview-providers::pool`
//! replaces the teacher's rolling-window health tracker with the spec's
//! account/strategy pool model).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::pool::{AcquireStrategy, LlmVendor, ProviderKind, ProviderPool};
use crate::provider::{ChatRequest, ChatResponse, LlmProvider, Message, ProviderError, Role};

/// The kinds of LLM call the turn pipeline issues (spec §4.B routing table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    QuestionGeneration,
    AnswerEvaluation,
    ReportGeneration,
    ConversationalFraming,
}

impl Task {
    fn key(&self) -> &'static str {
        match self {
            Task::QuestionGeneration => "question_generation",
            Task::AnswerEvaluation => "answer_evaluation",
            Task::ReportGeneration => "report_generation",
            Task::ConversationalFraming => "conversational_framing",
        }
    }
}

/// One entry of the task→model routing table: which vendor+model to use,
/// and the fallback vendor+model if the primary is rate-limited.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub vendor: &'static str,
    pub model: String,
    pub fallback_vendor: Option<&'static str>,
    pub fallback_model: Option<String>,
}

/// Looks up a per-session BYOK credential (spec §4.B step 1). Backed by the
/// ephemeral store at `session:<id>:byok` — see `interview-session::hot`.
#[async_trait]
pub trait ByokLookup: Send + Sync {
    async fn get(&self, session_id: &str) -> Option<String>;
}

/// Uniform entry point over several LLM vendors (spec §4.B).
pub struct LlmGateway {
    routes: HashMap<&'static str, RouteEntry>,
    providers: HashMap<&'static str, Arc<dyn LlmProvider>>,
    pool: Arc<ProviderPool>,
    byok: Option<Arc<dyn ByokLookup>>,
}

pub struct LlmGatewayBuilder {
    routes: HashMap<&'static str, RouteEntry>,
    providers: HashMap<&'static str, Arc<dyn LlmProvider>>,
    pool: Arc<ProviderPool>,
    byok: Option<Arc<dyn ByokLookup>>,
}

impl LlmGatewayBuilder {
    pub fn new(pool: Arc<ProviderPool>) -> Self {
        Self { routes: HashMap::new(), providers: HashMap::new(), pool, byok: None }
    }

    pub fn route(mut self, task: Task, entry: RouteEntry) -> Self {
        self.routes.insert(task.key(), entry);
        self
    }

    pub fn provider(mut self, vendor: &'static str, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(vendor, provider);
        self
    }

    pub fn byok(mut self, lookup: Arc<dyn ByokLookup>) -> Self {
        self.byok = Some(lookup);
        self
    }

    pub fn build(self) -> LlmGateway {
        LlmGateway { routes: self.routes, providers: self.providers, pool: self.pool, byok: self.byok }
    }
}

impl LlmGateway {
    /// Issue a single request/response LLM call (spec §4.B). Streaming is
    /// not part of the core contract.
    pub async fn generate(
        &self,
        task: Task,
        system: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
        session_id: Option<&str>,
    ) -> Result<String, ProviderError> {
        let req = ChatRequest {
            model: String::new(), // filled in per attempt below
            system: system.to_string(),
            messages: vec![Message { role: Role::User, content: prompt.to_string() }],
            max_tokens,
            temperature,
        };

        // Step 1: BYOK bypasses the pool entirely (spec §4.B / §9 "Pool vs. BYOK").
        if let (Some(session_id), Some(byok)) = (session_id, self.byok.as_ref()) {
            if let Some(key) = byok.get(session_id).await {
                debug!(task = task.key(), "using session BYOK credential");
                let client = crate::openai::OpenAiProvider::new("byok", key, None);
                let mut req = req.clone();
                req.model = self.routes.get(task.key()).map(|r| r.model.clone()).unwrap_or_else(|| "default".to_string());
                return client.send(&req).await.map(|r| r.content);
            }
        }

        let Some(route) = self.routes.get(task.key()).cloned() else {
            return Err(ProviderError::Unavailable(format!("no route configured for task {:?}", task.key())));
        };

        match self.try_vendor(route.vendor, &route.model, &req).await {
            Ok(resp) => Ok(resp),
            Err(ProviderError::RateLimited { .. }) => {
                // Step 4: fall back to the next configured provider for this task.
                let (Some(fallback_vendor), Some(fallback_model)) = (route.fallback_vendor, route.fallback_model.clone()) else {
                    return Err(ProviderError::Unavailable("primary rate-limited, no fallback configured".into()));
                };
                warn!(task = task.key(), primary = route.vendor, fallback = fallback_vendor, "primary rate-limited, falling back");
                self.try_vendor(fallback_vendor, &fallback_model, &req).await
            }
            Err(ProviderError::Http(_)) => {
                // Step 6: transport error — retry once on a different account
                // if available (same vendor, pool gives us another credential).
                warn!(task = task.key(), vendor = route.vendor, "transport error, retrying once");
                self.try_vendor(route.vendor, &route.model, &req).await
            }
            Err(other) => Err(other),
        }
    }

    async fn try_vendor(&self, vendor: &'static str, model: &str, req: &ChatRequest) -> Result<String, ProviderError> {
        let provider = self
            .providers
            .get(vendor)
            .ok_or_else(|| ProviderError::Unavailable(format!("vendor '{vendor}' not configured")))?;

        let kind = ProviderKind::Llm(LlmVendor(vendor));
        let handle = self.pool.acquire(&kind.pool_key(), AcquireStrategy::RoundRobin);
        let Some(handle) = handle else {
            return Err(ProviderError::PoolExhausted);
        };

        let mut req = req.clone();
        req.model = model.to_string();

        match provider.send(&req).await {
            Ok(resp) => {
                self.pool.report_success(&handle);
                Ok(resp.content)
            }
            Err(ProviderError::RateLimited { retry_after_ms }) => {
                // Step 4: 60s retry-after per spec, independent of what the
                // vendor reported, since the spec pins this duration.
                self.pool.report_error(&handle, "rate limited", Some(std::time::Duration::from_secs(60)));
                Err(ProviderError::RateLimited { retry_after_ms })
            }
            Err(e @ ProviderError::Api { status, .. }) if status != 429 => {
                // Step 5: 4xx other than 429 — no backoff, typed failure.
                self.pool.report_error(&handle, e.to_string(), None);
                Err(e)
            }
            Err(e) => {
                self.pool.report_error(&handle, e.to_string(), None);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingProvider {
        name: &'static str,
        calls: AtomicU32,
        fail_with: Option<ProviderError>,
    }

    #[async_trait]
    impl LlmProvider for CountingProvider {
        fn name(&self) -> &str {
            self.name
        }
        async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            Ok(ChatResponse { content: format!("ok from {}", self.name), model: req.model.clone(), tokens_in: 1, tokens_out: 1 })
        }
    }

    fn pool_with(vendor: &str) -> Arc<ProviderPool> {
        let pool = Arc::new(ProviderPool::new());
        pool.configure(ProviderKind::Llm(LlmVendor(Box::leak(vendor.to_string().into_boxed_str()))).pool_key(), vec!["k1".to_string()]);
        pool
    }

    #[tokio::test]
    async fn falls_back_on_rate_limit() {
        let pool = Arc::new(ProviderPool::new());
        pool.configure("llm:primary", vec!["k".to_string()]);
        pool.configure("llm:fallback", vec!["k".to_string()]);

        let primary = Arc::new(CountingProvider { name: "primary", calls: AtomicU32::new(0), fail_with: Some(ProviderError::RateLimited { retry_after_ms: 1000 }) });
        let fallback = Arc::new(CountingProvider { name: "fallback", calls: AtomicU32::new(0), fail_with: None });

        let gateway = LlmGatewayBuilder::new(pool)
            .provider("primary", primary.clone())
            .provider("fallback", fallback.clone())
            .route(Task::QuestionGeneration, RouteEntry { vendor: "primary", model: "small".into(), fallback_vendor: Some("fallback"), fallback_model: Some("small".into()) })
            .build();

        let out = gateway.generate(Task::QuestionGeneration, "sys", "prompt", 0.5, 100, None).await.unwrap();
        assert_eq!(out, "ok from fallback");
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_route_is_an_error() {
        let pool = pool_with("primary");
        let gateway = LlmGatewayBuilder::new(pool).build();
        let err = gateway.generate(Task::ReportGeneration, "sys", "prompt", 0.5, 100, None).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
