//! STT Streaming Bridge (spec §4.C): per-session outbound WebSocket to the
//! speech-to-text provider, PCM forwarding, transcript accumulation, and the
//! keepalive discipline that survives idle gaps (spec §9 "Keepalive as a
//! first-class obligation"). Grounded on the teacher's reqwest/provider-error
//! shape (`crate::openai`) generalized to a websocket transport, plus the
//! original `deepgram_client.py` accumulator/keepalive semantics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

use crate::provider::ProviderError;

/// One transcript event as the provider SDK would deliver it.
#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    pub text: String,
    pub is_final: bool,
    pub confidence: f32,
}

/// Callback invoked on every transcript event, re-scheduled onto the
/// session's owning task before it touches session state (spec §9).
pub type TranscriptCallback = Arc<dyn Fn(TranscriptEvent, String) + Send + Sync>;

const SILENCE_FRAME_SAMPLES: usize = 800; // ~50ms of 16kHz mono linear16 PCM
const KEEPALIVE_PERIOD: Duration = Duration::from_secs(2);

/// ~50ms of silence as 16-bit signed PCM, little-endian, all zero samples.
fn silence_frame() -> Vec<u8> {
    vec![0u8; SILENCE_FRAME_SAMPLES * 2]
}

struct AccumulatorState {
    /// Committed (final) text plus a trailing interim segment, if any.
    committed: String,
    trailing_interim: Option<String>,
}

impl AccumulatorState {
    fn new() -> Self {
        Self { committed: String::new(), trailing_interim: None }
    }

    /// Apply one transcript event (spec §4.C Transcript callback):
    /// interim results replace the trailing interim segment; finals append,
    /// or supersede the trailing interim if the final's lower-case form
    /// contains it.
    fn apply(&mut self, event: &TranscriptEvent) -> String {
        if event.is_final {
            let supersedes = self
                .trailing_interim
                .as_ref()
                .is_some_and(|interim| event.text.to_lowercase().contains(&interim.to_lowercase()));
            if supersedes || self.trailing_interim.is_some() {
                self.trailing_interim = None;
            }
            if !self.committed.is_empty() {
                self.committed.push(' ');
            }
            self.committed.push_str(&event.text);
        } else {
            self.trailing_interim = Some(event.text.clone());
        }
        self.accumulated()
    }

    fn accumulated(&self) -> String {
        match &self.trailing_interim {
            Some(interim) => format!("{}\u{2026}{}", self.committed, interim),
            None => self.committed.clone(),
        }
    }

    fn clear(&mut self) {
        self.committed.clear();
        self.trailing_interim = None;
    }
}

/// Per-session bridge to the STT provider. One instance lives for the
/// lifetime of a single recording turn; `stop` tears it down.
pub struct SttBridge {
    sender: Mutex<Option<mpsc::Sender<WsMessage>>>,
    accumulator: Mutex<AccumulatorState>,
    active: AtomicBool,
    last_send: Mutex<std::time::Instant>,
    keepalive_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SttBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sender: Mutex::new(None),
            accumulator: Mutex::new(AccumulatorState::new()),
            active: AtomicBool::new(false),
            last_send: Mutex::new(std::time::Instant::now()),
            keepalive_handle: Mutex::new(None),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Open the outbound connection and confirm it is actually established
    /// before declaring the session active (spec §4.C Start). `on_transcript`
    /// is invoked per event with the accumulated text at that point.
    pub async fn start(
        self: &Arc<Self>,
        ws_url: &str,
        on_transcript: TranscriptCallback,
    ) -> Result<(), ProviderError> {
        let (stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| ProviderError::Unavailable(format!("STT connect failed: {e}")))?;
        let (mut write, mut read) = stream.split();

        let (tx, mut rx) = mpsc::channel::<WsMessage>(64);
        *self.sender.lock().await = Some(tx);
        self.active.store(true, Ordering::SeqCst);
        self.accumulator.lock().await.clear();

        // Writer task: drains the channel onto the socket.
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if write.send(msg).await.is_err() {
                    break;
                }
            }
        });

        // Reader task: parses provider events, marshals them onto the
        // session's owning scheduler via `on_transcript` (spec §9: callbacks
        // fired from a provider worker thread are always rescheduled before
        // they touch session state).
        let this = self.clone();
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        if let Some(event) = parse_provider_event(&text) {
                            let accumulated = this.accumulator.lock().await.apply(&event);
                            on_transcript(event, accumulated);
                        }
                    }
                    Ok(WsMessage::Close(_)) | Err(_) => {
                        // A provider error/close during the start window is
                        // treated as start failure by the caller observing
                        // `is_active()` flip false.
                        this.active.store(false, Ordering::SeqCst);
                        break;
                    }
                    _ => {}
                }
            }
            this.active.store(false, Ordering::SeqCst);
        });

        self.spawn_keepalive();
        Ok(())
    }

    /// Forward one PCM frame; on send error the bridge flips inactive and
    /// subsequent sends return `false` without blocking (spec §4.C Forward).
    pub async fn send(&self, frame: Vec<u8>) -> bool {
        if !self.is_active() {
            return false;
        }
        let sent = {
            let guard = self.sender.lock().await;
            match guard.as_ref() {
                Some(tx) => tx.try_send(WsMessage::Binary(frame)).is_ok(),
                None => false,
            }
        };
        if sent {
            *self.last_send.lock().await = std::time::Instant::now();
        } else {
            self.active.store(false, Ordering::SeqCst);
        }
        sent
    }

    /// Dedicated keepalive task (spec §4.C Keepalive, §9): wakes every 2s;
    /// if more than 2s elapsed since the last outbound frame, sends a
    /// provider keepalive, falling back to ~50ms silence. Exits when the
    /// bridge (or the caller's liveness check) goes inactive.
    fn spawn_keepalive(self: &Arc<Self>) {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(KEEPALIVE_PERIOD);
            loop {
                interval.tick().await;
                if !this.is_active() {
                    break;
                }
                let elapsed = this.last_send.lock().await.elapsed();
                if elapsed >= KEEPALIVE_PERIOD {
                    if !this.send_keepalive_message().await {
                        this.send(silence_frame()).await;
                    }
                }
            }
        });
        // Replace any previous handle (shouldn't normally happen).
        if let Ok(mut guard) = self.keepalive_handle.try_lock() {
            *guard = Some(handle);
        }
    }

    /// Provider-level textual keepalive; returns false if the provider
    /// doesn't accept it (the caller then falls back to silence).
    async fn send_keepalive_message(&self) -> bool {
        let guard = self.sender.lock().await;
        match guard.as_ref() {
            Some(tx) => tx.try_send(WsMessage::Text(r#"{"type":"KeepAlive"}"#.to_string())).is_ok(),
            None => false,
        }
    }

    /// Send one final keepalive, wait ~1s for trailing finals, then close
    /// (spec §4.C Stop). The accumulator is cleared by the caller only
    /// after it consumes the accumulated text.
    pub async fn stop(self: &Arc<Self>, finalise_wait: Duration) -> String {
        self.send_keepalive_message().await;
        tokio::time::sleep(finalise_wait).await;

        self.active.store(false, Ordering::SeqCst);
        *self.sender.lock().await = None;
        if let Some(handle) = self.keepalive_handle.lock().await.take() {
            handle.abort();
        }

        self.accumulator.lock().await.accumulated()
    }

    pub async fn clear_accumulator(&self) {
        self.accumulator.lock().await.clear();
    }

    /// Current accumulated text without tearing anything down — used by the
    /// `speech_end` VAD hint to decide whether enough was said to submit
    /// implicitly (spec §4.H).
    pub async fn peek_accumulated(&self) -> String {
        self.accumulator.lock().await.accumulated()
    }

    /// An explicit provider-level keepalive triggered by an inbound client
    /// `ping` frame, on top of the dedicated keepalive task (spec §4.H).
    pub async fn send_extra_keepalive(&self) -> bool {
        if !self.is_active() {
            return false;
        }
        if self.send_keepalive_message().await {
            return true;
        }
        self.send(silence_frame()).await
    }
}

/// Parse a provider transcript event. Real SDKs vary in envelope shape;
/// this accepts `{type: "Results", text, is_final, confidence}`.
fn parse_provider_event(raw: &str) -> Option<TranscriptEvent> {
    let v: serde_json::Value = serde_json::from_str(raw).ok()?;
    if v.get("type").and_then(|t| t.as_str()) != Some("Results") {
        return None;
    }
    Some(TranscriptEvent {
        text: v.get("text")?.as_str()?.to_string(),
        is_final: v.get("is_final").and_then(|b| b.as_bool()).unwrap_or(false),
        confidence: v.get("confidence").and_then(|c| c.as_f64()).unwrap_or(0.0) as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interim_then_final_accumulates_with_ellipsis_sentinel() {
        let mut acc = AccumulatorState::new();
        let out = acc.apply(&TranscriptEvent { text: "hello wor".into(), is_final: false, confidence: 0.5 });
        assert_eq!(out, "\u{2026}hello wor");

        let out = acc.apply(&TranscriptEvent { text: "hello world".into(), is_final: true, confidence: 0.9 });
        assert_eq!(out, "hello world");
    }

    #[test]
    fn finals_append_across_multiple_segments() {
        let mut acc = AccumulatorState::new();
        acc.apply(&TranscriptEvent { text: "first sentence.".into(), is_final: true, confidence: 0.9 });
        let out = acc.apply(&TranscriptEvent { text: "second sentence.".into(), is_final: true, confidence: 0.9 });
        assert_eq!(out, "first sentence. second sentence.");
    }

    #[test]
    fn parses_results_event() {
        let raw = r#"{"type":"Results","text":"hi there","is_final":true,"confidence":0.87}"#;
        let event = parse_provider_event(raw).unwrap();
        assert_eq!(event.text, "hi there");
        assert!(event.is_final);
    }

    #[test]
    fn ignores_non_results_events() {
        assert!(parse_provider_event(r#"{"type":"Metadata"}"#).is_none());
    }

    #[tokio::test]
    async fn send_before_start_returns_false() {
        let bridge = SttBridge::new();
        assert!(!bridge.send(vec![0u8; 10]).await);
    }
}
