//! The client-facing WebSocket envelope (spec §6): `{type, data?}` JSON text
//! frames, audio payloads base64-encoded inside the envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw inbound frame — parse the `type` discriminator, then the payload
/// shape appropriate to it.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// The inbound message kinds spec §4.H / §6 define.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Ping,
    AudioChunk(AudioChunkData),
    StopRecording,
    SubmitAnswer(SubmitAnswerData),
    /// Legacy path, equivalent to `submit_answer` with a server-held transcript.
    Answer(SubmitAnswerData),
    SpeechEnd,
    GetCurrentQuestion,
}

impl InboundEnvelope {
    pub fn parse(self) -> Result<InboundMessage, String> {
        match self.frame_type.as_str() {
            "ping" => Ok(InboundMessage::Ping),
            "audio_chunk" => {
                let data: AudioChunkData = serde_json::from_value(self.data.unwrap_or(Value::Null))
                    .map_err(|e| e.to_string())?;
                Ok(InboundMessage::AudioChunk(data))
            }
            "stop_recording" => Ok(InboundMessage::StopRecording),
            "submit_answer" => {
                let data: SubmitAnswerData = serde_json::from_value(self.data.unwrap_or(Value::Null))
                    .map_err(|e| e.to_string())?;
                Ok(InboundMessage::SubmitAnswer(data))
            }
            "answer" => {
                let data: SubmitAnswerData = serde_json::from_value(self.data.unwrap_or(Value::Null))
                    .map_err(|e| e.to_string())?;
                Ok(InboundMessage::Answer(data))
            }
            "speech_end" => Ok(InboundMessage::SpeechEnd),
            "get_current_question" => Ok(InboundMessage::GetCurrentQuestion),
            other => Err(format!("unknown inbound frame type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioChunkData {
    /// Base64-encoded PCM16 mono 16kHz chunk.
    pub chunk: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u8,
}

fn default_sample_rate() -> u32 {
    16_000
}
fn default_channels() -> u8 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswerData {
    pub answer: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Outbound message types (spec §6).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "connected")]
    Connected,
    #[serde(rename = "resume")]
    Resume {
        status: String,
        phase: String,
        totals: ResumeTotals,
        flow_state: String,
    },
    #[serde(rename = "question")]
    Question { question: Value },
    #[serde(rename = "audio")]
    Audio {
        /// Base64 MP3 bytes.
        audio_base64: String,
    },
    #[serde(rename = "transcript")]
    Transcript {
        text: String,
        is_final: bool,
        accumulated: String,
    },
    #[serde(rename = "evaluation")]
    Evaluation { evaluation: Value },
    #[serde(rename = "flow_state")]
    FlowState { flow_state: String },
    #[serde(rename = "completed")]
    Completed {
        #[serde(skip_serializing_if = "Option::is_none")]
        report_id: Option<String>,
    },
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "pong")]
    Pong,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumeTotals {
    pub total_questions: u32,
    pub max_questions: u32,
}

impl OutboundMessage {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"error","message":"serialization failure"}"#.to_string())
    }
}

/// WebSocket close codes (spec §6).
pub mod close_codes {
    pub const GRACEFUL: u16 = 1000;
    pub const REPLACED: u16 = 1001;
    pub const DUPLICATE_REJECTED: u16 = 1008;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_audio_chunk() {
        let env = InboundEnvelope {
            frame_type: "audio_chunk".into(),
            data: Some(serde_json::json!({"chunk": "abcd", "sample_rate": 16000, "channels": 1})),
        };
        let msg = env.parse().unwrap();
        assert!(matches!(msg, InboundMessage::AudioChunk(d) if d.chunk == "abcd"));
    }

    #[test]
    fn rejects_unknown_type() {
        let env = InboundEnvelope { frame_type: "nonsense".into(), data: None };
        assert!(env.parse().is_err());
    }

    #[test]
    fn outbound_connected_serializes_tagged() {
        let json = OutboundMessage::Connected.to_json();
        assert_eq!(json, r#"{"type":"connected"}"#);
    }

    #[test]
    fn outbound_error_never_leaks_extra_fields() {
        let json = OutboundMessage::Error { message: "bad token for api_key=sk-xxx".into() }.to_json();
        assert!(json.contains("\"type\":\"error\""));
    }
}
