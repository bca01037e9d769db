//! Provider Pool (spec §4.A): per-kind set of credential accounts with
//! health and rate-limit accounting. Grounded on the teacher's
//! `skynet-agent/src/health.rs` rolling-window health tracker, but kept
//! behind a single `std::sync::Mutex` rather than that file's `DashMap` —
//! spec §4.A/§5 call for one mutex whose critical section is O(|pool|), not
//! per-key sharding — generalized to the account/strategy model the spec
//! describes.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Distinguishes which external vendor a pool belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Stt,
    Tts,
    Llm(LlmVendor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LlmVendor(pub &'static str);

impl ProviderKind {
    /// String key used to address the right sub-pool inside `ProviderPool`.
    pub fn pool_key(&self) -> String {
        match self {
            ProviderKind::Stt => "stt".to_string(),
            ProviderKind::Tts => "tts".to_string(),
            ProviderKind::Llm(vendor) => format!("llm:{}", vendor.0),
        }
    }
}

/// Selection strategy for `acquire` (spec §4.A).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStrategy {
    /// Least-recently-used among eligible accounts. Default.
    RoundRobin,
    /// Fewest `request_count` among eligible accounts.
    LeastUsed,
    /// Uniform-random among eligible accounts.
    Random,
}

impl Default for AcquireStrategy {
    fn default() -> Self {
        AcquireStrategy::RoundRobin
    }
}

/// An API credential plus its health/rate-limit bookkeeping (spec §3).
#[derive(Debug, Clone, Serialize)]
pub struct ProviderAccount {
    pub key: String,
    pub request_count: u64,
    pub error_count: u32,
    pub last_used: Option<DateTime<Utc>>,
    pub rate_limit_reset: Option<DateTime<Utc>>,
    pub healthy: bool,
    pub last_error: Option<String>,
}

/// Consecutive-error threshold past which an account is marked unhealthy
/// (spec §3 Invariants).
const UNHEALTHY_AFTER_ERRORS: u32 = 5;

impl ProviderAccount {
    fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            request_count: 0,
            error_count: 0,
            last_used: None,
            rate_limit_reset: None,
            healthy: true,
            last_error: None,
        }
    }

    fn is_rate_limited(&self, now: DateTime<Utc>) -> bool {
        self.rate_limit_reset.is_some_and(|reset| now < reset)
    }

    fn eligible(&self, now: DateTime<Utc>) -> bool {
        self.healthy && !self.is_rate_limited(now)
    }
}

/// An opaque handle into the pool returned by `acquire`. Carries enough
/// identity for `report_success`/`report_error` to find the account again
/// without exposing the credential key to callers that only hold a handle.
#[derive(Debug, Clone)]
pub struct AccountHandle {
    pub kind_key: String,
    pub account_key: String,
}

impl AccountHandle {
    pub fn key(&self) -> &str {
        &self.account_key
    }
}

struct PoolState {
    accounts: Vec<ProviderAccount>,
    /// Index into `accounts` of the last account returned by round-robin.
    round_robin_cursor: usize,
}

/// Holds one pool per provider kind, all mutation serialized behind a
/// single mutex (spec §4.A, §5 Shared resources).
pub struct ProviderPool {
    pools: Mutex<HashMap<String, PoolState>>,
}

impl ProviderPool {
    pub fn new() -> Self {
        Self { pools: Mutex::new(HashMap::new()) }
    }

    /// Populate a pool for `kind_key` from a list of credential strings
    /// (spec §6 Configuration: comma-separated credential lists).
    pub fn configure(&self, kind_key: impl Into<String>, keys: impl IntoIterator<Item = String>) {
        let accounts: Vec<ProviderAccount> = keys.into_iter().map(ProviderAccount::new).collect();
        let mut pools = self.pools.lock().unwrap();
        pools.insert(kind_key.into(), PoolState { accounts, round_robin_cursor: 0 });
    }

    /// Select one eligible account, or `None` if the pool is empty or every
    /// account is unhealthy/rate-limited. Never blocks.
    pub fn acquire(&self, kind_key: &str, strategy: AcquireStrategy) -> Option<AccountHandle> {
        let now = Utc::now();
        let mut pools = self.pools.lock().unwrap();
        let state = pools.get_mut(kind_key)?;
        if state.accounts.is_empty() {
            return None;
        }

        let eligible_idx: Vec<usize> = state
            .accounts
            .iter()
            .enumerate()
            .filter(|(_, a)| a.eligible(now))
            .map(|(i, _)| i)
            .collect();
        if eligible_idx.is_empty() {
            return None;
        }

        let chosen = match strategy {
            AcquireStrategy::LeastUsed => *eligible_idx
                .iter()
                .min_by_key(|&&i| state.accounts[i].request_count)
                .unwrap(),
            AcquireStrategy::Random => {
                let n = eligible_idx.len();
                eligible_idx[rand::random::<usize>() % n]
            }
            AcquireStrategy::RoundRobin => {
                // Least-recently-used among eligible: walk forward from the
                // cursor, picking the first eligible slot.
                let n = state.accounts.len();
                let start = state.round_robin_cursor;
                let mut pick = eligible_idx[0];
                for offset in 0..n {
                    let i = (start + offset) % n;
                    if eligible_idx.contains(&i) {
                        pick = i;
                        break;
                    }
                }
                state.round_robin_cursor = (pick + 1) % n;
                pick
            }
        };

        let key = state.accounts[chosen].key.clone();
        Some(AccountHandle { kind_key: kind_key.to_string(), account_key: key })
    }

    /// Record a successful call: bump request count, refresh `last_used`,
    /// clear the error streak and restore health (spec §4.A).
    pub fn report_success(&self, handle: &AccountHandle) {
        let mut pools = self.pools.lock().unwrap();
        let Some(state) = pools.get_mut(&handle.kind_key) else { return };
        let Some(account) = state.accounts.iter_mut().find(|a| a.key == handle.account_key) else { return };
        account.request_count += 1;
        account.last_used = Some(Utc::now());
        account.error_count = 0;
        account.healthy = true;
    }

    /// Record a failed call. `retry_after` marks the account rate-limited
    /// until `now + retry_after`; more than 5 consecutive errors marks the
    /// account unhealthy (spec §3 Invariants, §4.A).
    pub fn report_error(&self, handle: &AccountHandle, message: impl Into<String>, retry_after: Option<std::time::Duration>) {
        let mut pools = self.pools.lock().unwrap();
        let Some(state) = pools.get_mut(&handle.kind_key) else { return };
        let Some(account) = state.accounts.iter_mut().find(|a| a.key == handle.account_key) else { return };
        account.error_count += 1;
        account.last_error = Some(message.into());
        if account.error_count > UNHEALTHY_AFTER_ERRORS {
            account.healthy = false;
        }
        if let Some(retry_after) = retry_after {
            account.rate_limit_reset = Some(Utc::now() + chrono::Duration::from_std(retry_after).unwrap_or_default());
        }
    }

    /// Stats snapshot for all pools, surfaced on an operator/health endpoint.
    pub fn stats(&self) -> HashMap<String, Vec<ProviderAccount>> {
        let pools = self.pools.lock().unwrap();
        pools.iter().map(|(k, v)| (k.clone(), v.accounts.clone())).collect()
    }
}

impl Default for ProviderPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_returns_none_on_empty_pool() {
        let pool = ProviderPool::new();
        pool.configure("stt", Vec::<String>::new());
        assert!(pool.acquire("stt", AcquireStrategy::RoundRobin).is_none());
    }

    #[test]
    fn round_robin_cycles_through_accounts() {
        let pool = ProviderPool::new();
        pool.configure("llm", vec!["a".to_string(), "b".to_string()]);
        let h1 = pool.acquire("llm", AcquireStrategy::RoundRobin).unwrap();
        let h2 = pool.acquire("llm", AcquireStrategy::RoundRobin).unwrap();
        assert_ne!(h1.key(), h2.key());
    }

    #[test]
    fn more_than_five_consecutive_errors_marks_unhealthy() {
        let pool = ProviderPool::new();
        pool.configure("llm", vec!["a".to_string()]);
        let handle = pool.acquire("llm", AcquireStrategy::RoundRobin).unwrap();
        for _ in 0..6 {
            pool.report_error(&handle, "boom", None);
        }
        assert!(pool.acquire("llm", AcquireStrategy::RoundRobin).is_none());
    }

    #[test]
    fn success_restores_health_and_clears_errors() {
        let pool = ProviderPool::new();
        pool.configure("llm", vec!["a".to_string()]);
        let handle = pool.acquire("llm", AcquireStrategy::RoundRobin).unwrap();
        for _ in 0..6 {
            pool.report_error(&handle, "boom", None);
        }
        assert!(pool.acquire("llm", AcquireStrategy::RoundRobin).is_none());
        pool.report_success(&handle);
        assert!(pool.acquire("llm", AcquireStrategy::RoundRobin).is_some());
    }

    #[test]
    fn rate_limited_account_is_ineligible_until_reset() {
        let pool = ProviderPool::new();
        pool.configure("llm", vec!["a".to_string()]);
        let handle = pool.acquire("llm", AcquireStrategy::RoundRobin).unwrap();
        pool.report_error(&handle, "rate limited", Some(std::time::Duration::from_secs(60)));
        assert!(pool.acquire("llm", AcquireStrategy::RoundRobin).is_none());
    }

    #[test]
    fn least_used_picks_lowest_request_count() {
        let pool = ProviderPool::new();
        pool.configure("llm", vec!["a".to_string(), "b".to_string()]);
        let a = AccountHandle { kind_key: "llm".into(), account_key: "a".into() };
        pool.report_success(&a);
        pool.report_success(&a);
        let picked = pool.acquire("llm", AcquireStrategy::LeastUsed).unwrap();
        assert_eq!(picked.key(), "b");
    }
}
