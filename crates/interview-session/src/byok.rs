//! Adapts `SessionManager`'s BYOK storage to `interview_providers::llm::ByokLookup`
//! so the gateway can hand the LLM gateway a lookup backed by the same hot
//! tier the rest of session state lives in (spec §4.B step 1, §9 "Pool vs. BYOK").

use std::sync::Arc;

use async_trait::async_trait;
use interview_core::model::SessionId;
use interview_providers::llm::ByokLookup;

use crate::manager::SessionManager;

pub struct SessionByokLookup {
    manager: Arc<SessionManager>,
}

impl SessionByokLookup {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl ByokLookup for SessionByokLookup {
    async fn get(&self, session_id: &str) -> Option<String> {
        let id = SessionId(session_id.to_string());
        self.manager.get_byok(&id).await.ok().flatten()
    }
}
