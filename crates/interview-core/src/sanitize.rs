//! Credential and prompt redaction for client-facing error surfaces (§7).
//!
//! Any error string that looks like it references a credential or private
//! key field is rewritten to a generic message before it reaches a WS
//! `{type: error}` frame or an HTTP response body. Full detail still goes to
//! `tracing` server-side.

const CREDENTIAL_MARKERS: &[&str] = &[
    "api_key", "api-key", "apikey", "bearer ", "authorization", "byok",
    "private_key", "private-key", "secret", "token=", "sk-",
];

pub fn sanitize_for_client(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if CREDENTIAL_MARKERS.iter().any(|m| lower.contains(m)) {
        "service configuration error".to_string()
    } else {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_api_key_mentions() {
        assert_eq!(
            sanitize_for_client("upstream rejected api_key=sk-abc123"),
            "service configuration error"
        );
    }

    #[test]
    fn redacts_bearer_token() {
        assert_eq!(
            sanitize_for_client("Authorization: Bearer sk-ant-xyz failed"),
            "service configuration error"
        );
    }

    #[test]
    fn passes_through_benign_messages() {
        assert_eq!(
            sanitize_for_client("question generation timed out"),
            "question generation timed out"
        );
    }
}
