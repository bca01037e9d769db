//! Single-active-socket-per-session enforcement (spec §4.H, §9 "Single
//! active socket per session"). Grounded on the teacher's dashmap-keyed
//! `ws_clients` registry (`app.rs`), generalized with a liveness flag and a
//! cancellation token so a detectably-dead connection can be force-replaced
//! instead of merely rejected.

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

/// Close code a cancelled connection should send on its way out — set by
/// whoever cancels it, read by the connection task itself.
pub const CLOSE_REPLACED: u16 = 1001;
pub const CLOSE_GRACEFUL: u16 = 1000;

struct ConnEntry {
    conn_id: String,
    alive: Arc<AtomicBool>,
    cancel: CancellationToken,
    close_code: Arc<AtomicU16>,
}

/// What a successfully registered connection owns: its id (for safe
/// self-only cleanup), a flag it flips false the moment a send fails so a
/// reconnect attempt can tell it apart from a live one, and a token the
/// registry fires to force it to exit when replaced or manually ended.
pub struct ConnectionHandle {
    pub conn_id: String,
    pub alive: Arc<AtomicBool>,
    pub cancel: CancellationToken,
    /// Close code to use when `cancel` fires — `CLOSE_REPLACED` on
    /// replacement, `CLOSE_GRACEFUL` on manual end (spec §4.H, §6).
    pub close_code: Arc<AtomicU16>,
}

pub enum RegisterOutcome {
    Accepted(ConnectionHandle),
    /// A live connection already owns this session (spec §9: reject, don't
    /// replace — interrupting in-flight audio is worse than a 1008 close).
    Rejected,
}

pub struct ConnectionRegistry {
    conns: DashMap<String, ConnEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self { conns: DashMap::new() }
    }

    /// Register a socket for `session_id` (spec §4.H accept). Rejects if a
    /// live connection already holds it; force-cancels and replaces a dead
    /// one.
    pub fn register(&self, session_id: &str) -> RegisterOutcome {
        if let Some(existing) = self.conns.get(session_id) {
            if existing.alive.load(Ordering::SeqCst) {
                return RegisterOutcome::Rejected;
            }
            existing.close_code.store(CLOSE_REPLACED, Ordering::SeqCst);
            existing.cancel.cancel();
        }

        let conn_id = uuid::Uuid::new_v4().to_string();
        let alive = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();
        let close_code = Arc::new(AtomicU16::new(CLOSE_REPLACED));
        self.conns.insert(
            session_id.to_string(),
            ConnEntry { conn_id: conn_id.clone(), alive: alive.clone(), cancel: cancel.clone(), close_code: close_code.clone() },
        );
        RegisterOutcome::Accepted(ConnectionHandle { conn_id, alive, cancel, close_code })
    }

    /// Force the live connection (if any) for `session_id` to close with
    /// `CLOSE_GRACEFUL` — used by the manual-end REST endpoint (spec §6:
    /// "marks completed, triggers report, closes socket").
    pub fn close(&self, session_id: &str, code: u16) {
        if let Some(entry) = self.conns.get(session_id) {
            entry.close_code.store(code, Ordering::SeqCst);
            entry.cancel.cancel();
        }
    }

    /// Mark a connection as no longer reliably alive (a send failed but its
    /// own cleanup hasn't run yet), so the *next* register call can replace
    /// rather than reject it.
    pub fn mark_dead(&self, session_id: &str, conn_id: &str) {
        if let Some(entry) = self.conns.get(session_id) {
            if entry.conn_id == conn_id {
                entry.alive.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Remove the entry for `session_id`, but only if it is still `conn_id`'s
    /// — guards a replaced connection's own cleanup from deleting the
    /// connection that replaced it (spec §4.H Cleanup).
    pub fn deregister(&self, session_id: &str, conn_id: &str) {
        self.conns.remove_if(session_id, |_, entry| entry.conn_id == conn_id);
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_second_registration_while_first_is_alive() {
        let registry = ConnectionRegistry::new();
        assert!(matches!(registry.register("s1"), RegisterOutcome::Accepted(_)));
        assert!(matches!(registry.register("s1"), RegisterOutcome::Rejected));
    }

    #[test]
    fn replaces_a_connection_marked_dead() {
        let registry = ConnectionRegistry::new();
        let RegisterOutcome::Accepted(first) = registry.register("s1") else { panic!("expected accept") };
        registry.mark_dead("s1", &first.conn_id);

        let RegisterOutcome::Accepted(second) = registry.register("s1") else { panic!("expected accept") };
        assert!(first.cancel.is_cancelled());
        assert_ne!(first.conn_id, second.conn_id);
    }

    #[test]
    fn deregister_only_removes_the_owning_connection() {
        let registry = ConnectionRegistry::new();
        let RegisterOutcome::Accepted(first) = registry.register("s1") else { panic!("expected accept") };
        registry.mark_dead("s1", &first.conn_id);
        let RegisterOutcome::Accepted(second) = registry.register("s1") else { panic!("expected accept") };

        // The replaced connection's own cleanup runs late and must not evict
        // the connection that replaced it.
        registry.deregister("s1", &first.conn_id);
        assert!(matches!(registry.register("s1"), RegisterOutcome::Rejected));

        registry.deregister("s1", &second.conn_id);
        assert!(matches!(registry.register("s1"), RegisterOutcome::Accepted(_)));
    }
}
