//! Outbound frame construction (spec §4.H, §6): one function per message
//! kind, kept free of socket I/O so `connection.rs` decides when (and
//! whether) to actually send.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use interview_core::model::{Evaluation, FlowState, Question, Session};
use interview_providers::tts::TtsSynthesizer;
use interview_protocol::ws::{OutboundMessage, ResumeTotals};

const DEFAULT_VOICE: &str = "default";

pub fn resume(session: &Session) -> OutboundMessage {
    OutboundMessage::Resume {
        status: crate::http::enum_str(&session.status),
        phase: crate::http::enum_str(&session.phase),
        totals: ResumeTotals { total_questions: session.total_questions, max_questions: session.config.max_questions },
        flow_state: crate::http::enum_str(&session.flow_state),
    }
}

pub fn question(q: &Question) -> OutboundMessage {
    OutboundMessage::Question { question: serde_json::to_value(q).unwrap_or_default() }
}

/// Synthesize speech for a question, optionally prefixed with a transition
/// sentence (spec §4.G transition text precedes the next question). Returns
/// `None` (text-only degradation) on synthesis failure (spec §4.D).
pub async fn question_audio(tts: &TtsSynthesizer, q: &Question, transition: Option<&str>) -> Option<OutboundMessage> {
    let text = match transition {
        Some(t) if !t.is_empty() => format!("{t} {}", q.speakable_text()),
        _ => q.speakable_text().to_string(),
    };
    let bytes = tts.synthesize(&text, DEFAULT_VOICE).await?;
    Some(OutboundMessage::Audio { audio_base64: BASE64.encode(bytes) })
}

pub fn evaluation(e: &Evaluation) -> OutboundMessage {
    OutboundMessage::Evaluation { evaluation: serde_json::to_value(e).unwrap_or_default() }
}

pub fn flow_state(state: FlowState) -> OutboundMessage {
    OutboundMessage::FlowState { flow_state: crate::http::enum_str(&state) }
}

pub fn completed(report_id: Option<String>) -> OutboundMessage {
    OutboundMessage::Completed { report_id }
}

pub fn transcript(text: String, is_final: bool, accumulated: String) -> OutboundMessage {
    OutboundMessage::Transcript { text, is_final, accumulated }
}

pub fn error(message: impl Into<String>) -> OutboundMessage {
    OutboundMessage::Error { message: message.into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interview_core::model::QuestionType;

    #[test]
    fn question_message_embeds_the_question_json() {
        let q = Question::new("What is ownership?", "Rust", 1, QuestionType::Conceptual);
        let msg = question(&q);
        let json = msg.to_json();
        assert!(json.contains("\"type\":\"question\""));
        assert!(json.contains("What is ownership?"));
    }
}
