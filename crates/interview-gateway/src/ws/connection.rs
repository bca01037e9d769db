//! Session FSM & Socket Handler (spec §4.H): accepts the client-facing
//! WebSocket, enforces single-active-socket-per-session, drives the flow
//! state machine, and owns the per-connection STT bridge. Grounded on the
//! teacher's `ws::connection` axum-upgrade / `tokio::select!` loop shape,
//! generalized from the teacher's JSON-RPC envelope to the plain
//! `{type, data?}` frames spec §6 defines.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use interview_core::config::MAX_WS_PAYLOAD_BYTES;
use interview_core::model::{FlowState, Session, SessionId};
use interview_orchestrator::ingest_answer;
use interview_protocol::ws::{close_codes, InboundEnvelope, InboundMessage, OutboundMessage};
use interview_providers::stt::SttBridge;

use crate::app::AppState;
use crate::ws::handlers;
use crate::ws::outbound;
use crate::ws::registry::{ConnectionHandle, RegisterOutcome};

/// Axum handler — upgrades HTTP to WebSocket at GET `/ws/interview/{id}`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, id, headers))
}

/// Everything the per-connection task needs that outlives a single message.
struct ConnCtx {
    session_id: String,
    state: Arc<AppState>,
    handle: ConnectionHandle,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    stt: Arc<SttBridge>,
    last_client_activity: Instant,
}

/// Per-connection task — lives for the entire WS session lifetime.
async fn handle_connection(socket: WebSocket, state: Arc<AppState>, session_id: String, headers: HeaderMap) {
    let candidate_id = match state.auth.resolve(&headers) {
        Ok(id) => id,
        Err(e) => {
            close_immediately(socket, close_codes::DUPLICATE_REJECTED, &e.to_string()).await;
            return;
        }
    };

    let handle = match state.ws_registry.register(&session_id) {
        RegisterOutcome::Accepted(h) => h,
        RegisterOutcome::Rejected => {
            info!(session_id, "duplicate connection rejected");
            close_immediately(socket, close_codes::DUPLICATE_REJECTED, "duplicate connection rejected").await;
            return;
        }
    };

    let ttl_buffer = state.config.interview.hot_tier_ttl_buffer_secs;
    let session = match state.sessions.load(&SessionId(session_id.clone()), ttl_buffer).await {
        Ok(Some(s)) if s.candidate_id == candidate_id => s,
        Ok(Some(_)) => {
            state.ws_registry.deregister(&session_id, &handle.conn_id);
            close_immediately(socket, close_codes::DUPLICATE_REJECTED, "forbidden").await;
            return;
        }
        Ok(None) => {
            state.ws_registry.deregister(&session_id, &handle.conn_id);
            close_immediately(socket, close_codes::GRACEFUL, "no such interview").await;
            return;
        }
        Err(e) => {
            warn!(session_id, error = %e, "session load failed on connect");
            state.ws_registry.deregister(&session_id, &handle.conn_id);
            close_immediately(socket, close_codes::GRACEFUL, "internal error").await;
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<OutboundMessage>();

    if matches!(session.status, interview_core::model::InterviewStatus::Completed) {
        let _ = out_tx.send(OutboundMessage::Completed { report_id: session.report_id.clone() });
        drain_and_close(&mut sink, &mut out_rx, close_codes::GRACEFUL).await;
        state.ws_registry.deregister(&session_id, &handle.conn_id);
        return;
    }

    info!(session_id, candidate_id, "client authenticated, WS connection accepted");

    let _ = out_tx.send(OutboundMessage::Connected);
    match (&session.current_question, state.last_sent_questions.get(&session_id)) {
        (Some(q), Some(last)) if *last == q.id => {
            let _ = out_tx.send(outbound::resume(&session));
        }
        (Some(q), _) => {
            state.last_sent_questions.insert(session_id.clone(), q.id.clone());
            let _ = out_tx.send(outbound::question(q));
            let q = q.clone();
            let tts = state.tts.clone();
            let tx = out_tx.clone();
            tokio::spawn(async move {
                if let Some(audio) = outbound::question_audio(&tts, &q, None).await {
                    let _ = tx.send(audio);
                }
            });
        }
        (None, _) => {
            let _ = out_tx.send(outbound::resume(&session));
        }
    }

    let mut ctx = ConnCtx {
        session_id: session_id.clone(),
        state: state.clone(),
        handle,
        out_tx,
        stt: SttBridge::new(),
        last_client_activity: Instant::now(),
    };
    let mut session = session;

    let interval_cfg = &state.config.interview;
    let mut ping_tick = tokio::time::interval(Duration::from_secs(interval_cfg.ping_interval_secs));
    ping_tick.tick().await; // first tick fires immediately; consume it

    let receive_timeout = Duration::from_secs(interval_cfg.receive_timeout_secs);
    let idle_break = Duration::from_secs(interval_cfg.idle_break_secs);

    let mut was_cancelled = false;

    'outer: loop {
        tokio::select! {
            biased;

            // Fired by a replacing connection (spec §9) or the manual-end
            // REST endpoint (spec §6); `ctx.handle.close_code` carries which.
            _ = ctx.handle.cancel.cancelled() => {
                was_cancelled = true;
                break 'outer;
            }

            msg = tokio::time::timeout(receive_timeout, stream.next()) => {
                match msg {
                    Ok(Some(Ok(Message::Text(text)))) => {
                        ctx.last_client_activity = Instant::now();
                        if text.len() > MAX_WS_PAYLOAD_BYTES {
                            warn!(session_id = %ctx.session_id, size = text.len(), "payload too large, dropping");
                            continue;
                        }
                        handle_text_frame(&mut ctx, &mut session, text.as_str()).await;
                    }
                    Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break 'outer,
                    Ok(Some(Ok(_))) => {}
                    Ok(Some(Err(e))) => {
                        warn!(session_id = %ctx.session_id, error = %e, "ws read error");
                        break 'outer;
                    }
                    Err(_elapsed) => {
                        // 120s receive wait elapsed with no traffic; only bail
                        // once truly idle past 180s (spec §4.H Receive timeout).
                        if ctx.last_client_activity.elapsed() > idle_break {
                            break 'outer;
                        }
                    }
                }
            }

            _ = ping_tick.tick() => {
                let _ = ctx.out_tx.send(OutboundMessage::Pong);
            }

            out = out_rx.recv() => {
                match out {
                    Some(payload) => {
                        if sink.send(Message::Text(payload.to_json().into())).await.is_err() {
                            ctx.state.ws_registry.mark_dead(&ctx.session_id, &ctx.handle.conn_id);
                            break 'outer;
                        }
                    }
                    None => break 'outer,
                }
            }
        }
    }

    // A normal exit (client close, idle timeout, read/write error) closes
    // gracefully; only a cancellation carries an explicit replaced/ended code.
    let close_code = if was_cancelled { ctx.handle.close_code.load(Ordering::SeqCst) } else { close_codes::GRACEFUL };
    drain_and_close(&mut sink, &mut out_rx, close_code).await;

    if ctx.stt.is_active() {
        ctx.stt.stop(Duration::from_secs(interval_cfg.stt_finalise_wait_secs)).await;
    }
    ctx.state.ws_registry.deregister(&ctx.session_id, &ctx.handle.conn_id);
    info!(session_id = %ctx.session_id, "WS connection closed");
}

/// Dispatch one inbound text frame to its handler (spec §4.H Message loop).
async fn handle_text_frame(ctx: &mut ConnCtx, session: &mut Session, text: &str) {
    let envelope: InboundEnvelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            let _ = ctx.out_tx.send(outbound::error(format!("malformed frame: {e}")));
            return;
        }
    };
    let msg = match envelope.parse() {
        Ok(m) => m,
        Err(e) => {
            let _ = ctx.out_tx.send(outbound::error(e));
            return;
        }
    };

    match msg {
        InboundMessage::Ping => {
            let _ = ctx.out_tx.send(OutboundMessage::Pong);
            if ctx.stt.is_active() {
                ctx.stt.send_extra_keepalive().await;
            }
        }
        InboundMessage::AudioChunk(data) => {
            let bytes = match handlers::decode_audio_chunk(&data) {
                Ok(b) => b,
                Err(e) => {
                    let _ = ctx.out_tx.send(outbound::error(e));
                    return;
                }
            };
            if session.flow_state != FlowState::UserSpeaking {
                session.flow_state = FlowState::UserSpeaking;
                let _ = ctx.out_tx.send(outbound::flow_state(session.flow_state));
                persist(ctx, session).await;
            }
            ensure_stt_started(ctx).await;
            ctx.stt.send(bytes).await;
        }
        InboundMessage::StopRecording => {
            finalize_turn(ctx, session, None).await;
        }
        InboundMessage::SubmitAnswer(data) => {
            finalize_turn(ctx, session, Some(data)).await;
        }
        InboundMessage::Answer(data) => {
            finalize_turn(ctx, session, Some(data)).await;
        }
        InboundMessage::SpeechEnd => {
            if ctx.stt.is_active() {
                let accumulated = ctx.stt.peek_accumulated().await;
                if handlers::should_submit_on_speech_end(&accumulated) {
                    finalize_turn(ctx, session, None).await;
                }
            }
        }
        InboundMessage::GetCurrentQuestion => {
            if let Some(q) = &session.current_question {
                let _ = ctx.out_tx.send(outbound::question(q));
                let tts = ctx.state.tts.clone();
                let tx = ctx.out_tx.clone();
                let q = q.clone();
                tokio::spawn(async move {
                    if let Some(audio) = outbound::question_audio(&tts, &q, None).await {
                        let _ = tx.send(audio);
                    }
                });
            }
        }
    }
}

/// Lazily start the STT bridge on first inbound audio chunk (spec §4.C
/// Start, §4.H `audio_chunk`).
async fn ensure_stt_started(ctx: &mut ConnCtx) {
    if ctx.stt.is_active() {
        return;
    }
    let tx = ctx.out_tx.clone();
    let callback: interview_providers::stt::TranscriptCallback = Arc::new(move |event, accumulated| {
        let _ = tx.send(outbound::transcript(event.text.clone(), event.is_final, accumulated));
    });
    if let Err(e) = ctx.stt.start(&ctx.state.stt_ws_url, callback).await {
        warn!(session_id = %ctx.session_id, error = %e, "STT bridge start failed");
        let _ = ctx.out_tx.send(outbound::error("speech recognition is temporarily unavailable"));
    }
}

/// Finalise the current turn — either via `stop_recording`'s
/// keepalive-then-wait handshake (reading the STT accumulator) or
/// `submit_answer`'s client-supplied transcript — and run the turn pipeline
/// (spec §4.G, §4.H).
async fn finalize_turn(ctx: &mut ConnCtx, session: &mut Session, client_transcript: Option<interview_protocol::ws::SubmitAnswerData>) {
    let (answer_text, code) = match client_transcript {
        Some(data) => (data.answer, data.code),
        None => {
            if !ctx.stt.is_active() {
                let _ = ctx.out_tx.send(outbound::error("no active recording to finalise"));
                return;
            }
            let finalise_wait = Duration::from_secs(ctx.state.config.interview.stt_finalise_wait_secs);
            let text = ctx.stt.stop(finalise_wait).await;
            ctx.stt.clear_accumulator().await;
            (text, None)
        }
    };

    if session.current_question.is_none() {
        let _ = ctx.out_tx.send(outbound::error("no current question to answer"));
        return;
    }

    let ttl_buffer = ctx.state.config.interview.hot_tier_ttl_buffer_secs;
    let outcome = match ingest_answer(&ctx.state.sessions, &ctx.state.llm, session, answer_text, code, None, ttl_buffer).await {
        Ok(o) => o,
        Err(e) => {
            let _ = ctx.out_tx.send(outbound::error(e.sanitized_message()));
            return;
        }
    };

    let _ = ctx.out_tx.send(outbound::evaluation(&outcome.evaluation));

    if outcome.completed {
        let report_id = uuid::Uuid::new_v4().to_string();
        crate::report_task::spawn(ctx.state.clone(), session.clone(), report_id.clone(), ttl_buffer);
        let _ = ctx.out_tx.send(outbound::flow_state(session.flow_state));
        let _ = ctx.out_tx.send(outbound::completed(Some(report_id)));
        return;
    }

    let next_question = outcome.next_question.expect("non-completed outcome always carries a next question");
    ctx.state.last_sent_questions.insert(ctx.session_id.clone(), next_question.id.clone());
    let _ = ctx.out_tx.send(outbound::flow_state(session.flow_state));
    let _ = ctx.out_tx.send(outbound::question(&next_question));

    let tts = ctx.state.tts.clone();
    let tx = ctx.out_tx.clone();
    let transition = outcome.transition;
    tokio::spawn(async move {
        if let Some(audio) = outbound::question_audio(&tts, &next_question, transition.as_deref()).await {
            let _ = tx.send(audio);
        }
    });
}

async fn persist(ctx: &ConnCtx, session: &Session) {
    let ttl_buffer = ctx.state.config.interview.hot_tier_ttl_buffer_secs;
    if let Err(e) = ctx.state.sessions.save(session, ttl_buffer).await {
        tracing::debug!(session_id = %ctx.session_id, error = %e, "session persist failed");
    }
}

async fn close_immediately(socket: WebSocket, code: u16, reason: &str) {
    let (mut sink, _) = socket.split();
    let _ = sink
        .send(Message::Close(Some(CloseFrame { code, reason: reason.to_string().into() })))
        .await;
}

async fn drain_and_close(
    sink: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    out_rx: &mut mpsc::UnboundedReceiver<OutboundMessage>,
    code: u16,
) {
    while let Ok(payload) = out_rx.try_recv() {
        if sink.send(Message::Text(payload.to_json().into())).await.is_err() {
            return;
        }
    }
    let reason = match code {
        close_codes::REPLACED => "connection replaced",
        close_codes::DUPLICATE_REJECTED => "duplicate connection rejected",
        _ => "interview complete",
    };
    let _ = sink.send(Message::Close(Some(CloseFrame { code, reason: reason.into() }))).await;
}
