use thiserror::Error;

/// Errors surfaced by the session store (spec §4.E, §7).
///
/// Persistence failures of either tier are advisory to the request path —
/// callers in `interview-gateway` log these at debug and keep going rather
/// than propagating them to the client (spec §4.E).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
