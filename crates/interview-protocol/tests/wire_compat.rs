// Wire format tests for the client-facing envelope. Breaking any of these
// changes what a connected client has to handle.

use interview_protocol::http::{ErrorResponse, StartInterviewRequest};
use interview_protocol::ws::{InboundEnvelope, InboundMessage, OutboundMessage, ResumeTotals};

#[test]
fn ping_envelope_round_trip() {
    let json = r#"{"type":"ping"}"#;
    let env: InboundEnvelope = serde_json::from_str(json).unwrap();
    assert!(matches!(env.parse().unwrap(), InboundMessage::Ping));
}

#[test]
fn submit_answer_envelope_parses_code_fields() {
    let json = r#"{"type":"submit_answer","data":{"answer":"it's O(n)","code":"fn f(){}","language":"rust"}}"#;
    let env: InboundEnvelope = serde_json::from_str(json).unwrap();
    match env.parse().unwrap() {
        InboundMessage::SubmitAnswer(data) => {
            assert_eq!(data.answer, "it's O(n)");
            assert_eq!(data.code.as_deref(), Some("fn f(){}"));
            assert_eq!(data.language.as_deref(), Some("rust"));
        }
        other => panic!("expected SubmitAnswer, got {other:?}"),
    }
}

#[test]
fn audio_chunk_defaults_sample_rate_and_channels() {
    let json = r#"{"type":"audio_chunk","data":{"chunk":"ZGF0YQ=="}}"#;
    let env: InboundEnvelope = serde_json::from_str(json).unwrap();
    match env.parse().unwrap() {
        InboundMessage::AudioChunk(data) => {
            assert_eq!(data.sample_rate, 16_000);
            assert_eq!(data.channels, 1);
        }
        other => panic!("expected AudioChunk, got {other:?}"),
    }
}

#[test]
fn resume_frame_serializes_tagged_type() {
    let msg = OutboundMessage::Resume {
        status: "in_progress".into(),
        phase: "coding".into(),
        totals: ResumeTotals { total_questions: 3, max_questions: 15 },
        flow_state: "awaiting_answer".into(),
    };
    let json = msg.to_json();
    assert!(json.contains(r#""type":"resume""#));
    assert!(json.contains(r#""total_questions":3"#));
}

#[test]
fn pong_has_no_data_field() {
    let json = OutboundMessage::Pong.to_json();
    assert_eq!(json, r#"{"type":"pong"}"#);
}

#[test]
fn start_interview_request_round_trip() {
    let json = r#"{"user_id":"cand-9","role":"platform engineer","experience_level":"senior"}"#;
    let req: StartInterviewRequest = serde_json::from_str(json).unwrap();
    assert_eq!(req.user_id, "cand-9");
    assert_eq!(req.experience_level.as_deref(), Some("senior"));
}

#[test]
fn error_response_carries_code_and_message() {
    let resp = ErrorResponse::new("validation_error", "role is required");
    let json = serde_json::to_string(&resp).unwrap();
    assert!(json.contains(r#""code":"validation_error""#));
    assert!(json.contains(r#""message":"role is required""#));
}
