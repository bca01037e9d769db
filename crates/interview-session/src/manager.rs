//! Session State & Persistence (spec §4.E): cache-through between the hot
//! (ephemeral, TTL) and cold (durable) tiers. Grounded on the teacher's
//! `skynet-sessions::manager` mutex-guarded store shape and
//! `skynet-memory::manager`'s cache-through read/write pattern, generalized
//! from a SQLite row store to the two-tier KV/document model the spec
//! describes.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use interview_core::model::Session;
use interview_core::model::SessionId;

use crate::cold::ColdStore;
use crate::error::Result;
use crate::hot::HotStore;

const MIN_TTL_SECS: i64 = 3600;

fn session_key(id: &SessionId) -> String {
    format!("session:{}", id.as_str())
}

fn byok_key(id: &SessionId) -> String {
    format!("session:{}:byok", id.as_str())
}

fn candidate_index_key(candidate_id: &str) -> String {
    format!("candidate:{candidate_id}:sessions")
}

/// Cache-through session store (spec §4.E). Both tiers serialise the same
/// JSON document; timestamps are RFC3339 strings end to end (see
/// `interview_core::model`, and DESIGN.md's Open Question decision on this).
pub struct SessionManager {
    hot: Arc<dyn HotStore>,
    cold: Arc<dyn ColdStore>,
}

impl SessionManager {
    pub fn new(hot: Arc<dyn HotStore>, cold: Arc<dyn ColdStore>) -> Self {
        Self { hot, cold }
    }

    /// Hot-tier TTL: `max(remaining_interview_seconds + 30min, 1h)` (spec §4.E).
    fn ttl_for(session: &Session, ttl_buffer_secs: i64) -> Duration {
        let remaining_secs = match &session.started_at {
            Some(started_at) => {
                let started = chrono::DateTime::parse_from_rfc3339(started_at)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .unwrap_or_else(|_| chrono::Utc::now());
                let elapsed = chrono::Utc::now().signed_duration_since(started).num_seconds();
                let budget = session.config.duration_minutes * 60;
                (budget - elapsed).max(0)
            }
            None => session.config.duration_minutes * 60,
        };
        let secs = (remaining_secs + ttl_buffer_secs).max(MIN_TTL_SECS);
        Duration::from_secs(secs as u64)
    }

    pub async fn create(&self, session: Session, ttl_buffer_secs: i64) -> Result<Session> {
        self.persist(&session, ttl_buffer_secs).await?;
        self.index_for_candidate(&session.candidate_id, &session.id).await;
        Ok(session)
    }

    /// Best-effort append to the candidate's session-id index, backing
    /// `GET /interviews` (spec §6). Never fails the caller.
    async fn index_for_candidate(&self, candidate_id: &str, id: &SessionId) {
        let key = candidate_index_key(candidate_id);
        let mut ids: Vec<String> = match self.cold.get(&key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
            _ => Vec::new(),
        };
        if !ids.iter().any(|existing| existing == id.as_str()) {
            ids.push(id.as_str().to_string());
        }
        if let Ok(raw) = serde_json::to_string(&ids) {
            if let Err(e) = self.cold.put(&key, raw).await {
                debug!(error = %e, candidate_id, "candidate session index write failed");
            }
        }
    }

    /// All sessions ever created for a candidate, most-recently-created last
    /// (spec §6 `GET /interviews`). Best-effort: sessions that have since
    /// expired from both tiers are silently skipped.
    pub async fn list_for_candidate(&self, candidate_id: &str, ttl_buffer_secs: i64) -> Result<Vec<Session>> {
        let key = candidate_index_key(candidate_id);
        let Some(raw) = self.cold.get(&key).await? else { return Ok(Vec::new()) };
        let ids: Vec<String> = serde_json::from_str(&raw)?;
        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(session) = self.load(&SessionId(id), ttl_buffer_secs).await? {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    /// Read from the hot tier; on miss fall through to cold and hydrate the
    /// hot tier (TTL recomputed) (spec §4.E).
    pub async fn load(&self, id: &SessionId, ttl_buffer_secs: i64) -> Result<Option<Session>> {
        let key = session_key(id);
        if let Some(raw) = self.hot.get(&key).await? {
            return Ok(Some(serde_json::from_str(&raw)?));
        }

        let Some(raw) = self.cold.get(&key).await? else { return Ok(None) };
        let session: Session = serde_json::from_str(&raw)?;
        let ttl = Self::ttl_for(&session, ttl_buffer_secs);
        if let Err(e) = self.hot.set(&key, raw, ttl).await {
            debug!(error = %e, "hot-tier hydrate failed after cold hit");
        }
        Ok(Some(session))
    }

    /// Write to both tiers (best-effort on cold); failures are logged at
    /// debug and never propagated (spec §4.E).
    pub async fn save(&self, session: &Session, ttl_buffer_secs: i64) -> Result<()> {
        self.persist(session, ttl_buffer_secs).await
    }

    async fn persist(&self, session: &Session, ttl_buffer_secs: i64) -> Result<()> {
        let key = session_key(&session.id);
        let raw = serde_json::to_string(session)?;
        let ttl = Self::ttl_for(session, ttl_buffer_secs);

        if let Err(e) = self.hot.set(&key, raw.clone(), ttl).await {
            debug!(error = %e, session_id = %session.id, "hot-tier write failed");
        }
        if let Err(e) = self.cold.put(&key, raw).await {
            debug!(error = %e, session_id = %session.id, "cold-tier write failed");
        }
        Ok(())
    }

    pub async fn mark_started(&self, id: &SessionId, ttl_buffer_secs: i64) -> Result<Option<Session>> {
        let Some(mut session) = self.load(id, ttl_buffer_secs).await? else { return Ok(None) };
        session.mark_started();
        self.save(&session, ttl_buffer_secs).await?;
        Ok(Some(session))
    }

    /// Idempotent: a second call on an already-completed session is a no-op
    /// save, not a second transition (spec §3 invariant, §8 idempotence).
    pub async fn mark_completed(&self, id: &SessionId, ttl_buffer_secs: i64) -> Result<Option<Session>> {
        let Some(mut session) = self.load(id, ttl_buffer_secs).await? else { return Ok(None) };
        session.mark_completed();
        self.save(&session, ttl_buffer_secs).await?;
        Ok(Some(session))
    }

    /// Persist the per-session BYOK credential (spec §4.B, §5): stored once
    /// at session start with a TTL covering the interview, read on demand by
    /// the LLM gateway, never written to the cold tier.
    pub async fn set_byok(&self, id: &SessionId, api_key: &str, ttl: Duration) -> Result<()> {
        self.hot.set(&byok_key(id), api_key.to_string(), ttl).await
    }

    pub async fn get_byok(&self, id: &SessionId) -> Result<Option<String>> {
        self.hot.get(&byok_key(id)).await
    }

    /// Durable report write + session patch with `report_id` (spec §4.I).
    pub async fn save_report(&self, id: &SessionId, report_id: &str, report_json: &str, ttl_buffer_secs: i64) -> Result<()> {
        self.cold.put(&format!("report:{report_id}"), report_json.to_string()).await?;
        if let Some(mut session) = self.load(id, ttl_buffer_secs).await? {
            session.report_id = Some(report_id.to_string());
            self.save(&session, ttl_buffer_secs).await?;
        }
        Ok(())
    }

    pub async fn load_report(&self, report_id: &str) -> Result<Option<String>> {
        self.cold.get(&format!("report:{report_id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cold::InMemoryColdStore;
    use crate::hot::InMemoryHotStore;
    use interview_core::model::{ResumeSnapshot, SessionConfig};

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(InMemoryHotStore::new()), Arc::new(InMemoryColdStore::new()))
    }

    fn config() -> SessionConfig {
        SessionConfig { role: "backend-developer".into(), duration_minutes: 30, max_questions: 15, experience_level: None }
    }

    #[tokio::test]
    async fn create_then_load_round_trips() {
        let mgr = manager();
        let session = Session::new("cand-1", config(), ResumeSnapshot::default(), 5);
        let id = session.id.clone();
        mgr.create(session, 1800).await.unwrap();

        let loaded = mgr.load(&id, 1800).await.unwrap().unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.candidate_id, "cand-1");
    }

    #[tokio::test]
    async fn cold_hit_rehydrates_hot_tier() {
        let hot = Arc::new(InMemoryHotStore::new());
        let cold = Arc::new(InMemoryColdStore::new());
        let mgr = SessionManager::new(hot.clone(), cold.clone());

        let session = Session::new("cand-2", config(), ResumeSnapshot::default(), 5);
        let id = session.id.clone();
        mgr.create(session, 1800).await.unwrap();

        hot.delete(&session_key(&id)).await.unwrap();
        assert!(hot.get(&session_key(&id)).await.unwrap().is_none());

        let loaded = mgr.load(&id, 1800).await.unwrap();
        assert!(loaded.is_some());
        assert!(hot.get(&session_key(&id)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn mark_completed_twice_is_idempotent() {
        let mgr = manager();
        let mut session = Session::new("cand-3", config(), ResumeSnapshot::default(), 5);
        session.mark_started();
        let id = session.id.clone();
        mgr.create(session, 1800).await.unwrap();

        let first = mgr.mark_completed(&id, 1800).await.unwrap().unwrap();
        let second = mgr.mark_completed(&id, 1800).await.unwrap().unwrap();
        assert_eq!(first.status, second.status);
        assert_eq!(second.status, interview_core::model::InterviewStatus::Completed);
    }

    #[tokio::test]
    async fn byok_is_never_written_to_cold_tier() {
        let cold = Arc::new(InMemoryColdStore::new());
        let mgr = SessionManager::new(Arc::new(InMemoryHotStore::new()), cold.clone());
        let id = SessionId::new();
        mgr.set_byok(&id, "sk-test-key", Duration::from_secs(3600)).await.unwrap();
        assert_eq!(mgr.get_byok(&id).await.unwrap().as_deref(), Some("sk-test-key"));
        assert!(cold.get(&format!("session:{}:byok", id.as_str())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_for_candidate_returns_created_sessions() {
        let mgr = manager();
        let s1 = Session::new("cand-4", config(), ResumeSnapshot::default(), 5);
        let s2 = Session::new("cand-4", config(), ResumeSnapshot::default(), 5);
        mgr.create(s1.clone(), 1800).await.unwrap();
        mgr.create(s2.clone(), 1800).await.unwrap();

        let listed = mgr.list_for_candidate("cand-4", 1800).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|s| s.id == s1.id));
        assert!(listed.iter().any(|s| s.id == s2.id));

        assert!(mgr.list_for_candidate("nobody", 1800).await.unwrap().is_empty());
    }
}
