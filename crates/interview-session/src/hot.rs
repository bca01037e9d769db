//! Hot tier (spec §4.E): the ephemeral key-value store, out of scope per
//! spec §1 ("the key-value state store" is an external collaborator) — this
//! module owns only the interface and touch-on-write TTL discipline, behind
//! a trait so a real backend (Redis, etc.) can be substituted without
//! touching `SessionManager`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::Result;

/// Minimal ephemeral KV surface the session manager needs: get/set with a
/// TTL that is refreshed on every write (touch-on-write, spec §4.E).
#[async_trait]
pub trait HotStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process stand-in for the real ephemeral store, used in tests and
/// single-node deployments without a configured `ephemeral_store_url`
/// (spec §6 Configuration).
pub struct InMemoryHotStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryHotStore {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl Default for InMemoryHotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HotStore for InMemoryHotStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(e) if e.expires_at > Instant::now() => Ok(Some(e.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), Entry { value, expires_at: Instant::now() + ttl });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn touch_on_write_refreshes_ttl() {
        let store = InMemoryHotStore::new();
        store.set("k", "v1".into(), Duration::from_millis(50)).await.unwrap();
        store.set("k", "v2".into(), Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(store.get("k").await.unwrap(), Some("v2".into()));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_miss() {
        let store = InMemoryHotStore::new();
        store.set("k", "v".into(), Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
