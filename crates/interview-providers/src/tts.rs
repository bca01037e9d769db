//! TTS Synthesizer (spec §4.D): one-shot text→audio request with retry on
//! transient failure. Grounded on `crate::openai`'s reqwest/retry shape.

use std::time::Duration;

use tracing::warn;

use crate::pool::{AcquireStrategy, ProviderKind, ProviderPool};
use crate::provider::ProviderError;

const MAX_RETRIES: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct TtsSynthesizer {
    client: reqwest::Client,
    base_url: String,
    api_key_header: &'static str,
    pool: std::sync::Arc<ProviderPool>,
}

impl TtsSynthesizer {
    pub fn new(base_url: impl Into<String>, pool: std::sync::Arc<ProviderPool>) -> Self {
        Self {
            client: reqwest::Client::builder().timeout(Duration::from_secs(30)).build().unwrap_or_default(),
            base_url: base_url.into(),
            api_key_header: "authorization",
            pool,
        }
    }

    /// Synthesize `text` spoken in `voice`. Returns `None` on persistent
    /// failure so the caller can emit the question text-only (spec §4.D).
    pub async fn synthesize(&self, text: &str, voice: &str) -> Option<Vec<u8>> {
        let handle = self.pool.acquire(&ProviderKind::Tts.pool_key(), AcquireStrategy::RoundRobin)?;

        for attempt in 0..=MAX_RETRIES {
            match self.try_once(text, voice, handle.key()).await {
                Ok(bytes) => {
                    self.pool.report_success(&handle);
                    return Some(bytes);
                }
                Err(e) if is_transient(&e) && attempt < MAX_RETRIES => {
                    warn!(attempt, error = %e, "TTS call failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => {
                    self.pool.report_error(&handle, e.to_string(), None);
                    warn!(error = %e, "TTS synthesis failed, returning text-only");
                    return None;
                }
            }
        }
        None
    }

    async fn try_once(&self, text: &str, voice: &str, api_key: &str) -> Result<Vec<u8>, ProviderError> {
        let resp = self
            .client
            .post(&self.base_url)
            .header(self.api_key_header, format!("Bearer {api_key}"))
            .json(&serde_json::json!({ "text": text, "voice": voice }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, message: body });
        }

        Ok(resp.bytes().await.map_err(ProviderError::from)?.to_vec())
    }
}

fn is_transient(err: &ProviderError) -> bool {
    matches!(err, ProviderError::Http(_) | ProviderError::Unavailable(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classifies_transport_errors() {
        assert!(is_transient(&ProviderError::Http("timeout".into())));
        assert!(is_transient(&ProviderError::Unavailable("connect refused".into())));
        assert!(!is_transient(&ProviderError::Api { status: 400, message: "bad request".into() }));
    }

    #[tokio::test]
    async fn no_eligible_account_returns_none() {
        let pool = std::sync::Arc::new(ProviderPool::new());
        pool.configure(ProviderKind::Tts.pool_key(), Vec::<String>::new());
        let synth = TtsSynthesizer::new("http://localhost:0/synthesize", pool);
        assert!(synth.synthesize("hello", "voice-1").await.is_none());
    }
}
