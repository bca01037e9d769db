//! Cold tier (spec §4.E): the durable document store, out of scope per
//! spec §1 — this module owns only the trait interface a real backend
//! (document database) implements.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;

#[async_trait]
pub trait ColdStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: String) -> Result<()>;
}

/// In-process stand-in for the real durable store, used in tests and when
/// no `durable_store_project_id` is configured (spec §6 Configuration).
pub struct InMemoryColdStore {
    docs: Mutex<HashMap<String, String>>,
}

impl InMemoryColdStore {
    pub fn new() -> Self {
        Self { docs: Mutex::new(HashMap::new()) }
    }
}

impl Default for InMemoryColdStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ColdStore for InMemoryColdStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.docs.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.docs.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}
