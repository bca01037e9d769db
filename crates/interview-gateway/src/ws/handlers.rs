//! Pure helpers for `connection.rs`'s message loop — kept free of socket and
//! session I/O so they stay trivially testable (spec §4.H `audio_chunk`,
//! `speech_end`).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use interview_protocol::ws::AudioChunkData;

/// Minimum accumulated transcript length treated as a real answer rather
/// than noise when the client signals `speech_end` without an explicit
/// `stop_recording`/`submit_answer` (spec §4.H `speech_end`).
const IMPLICIT_SUBMIT_MIN_CHARS: usize = 10;

/// Decode an inbound `audio_chunk` frame's base64 payload into raw PCM
/// bytes (spec §4.C Forward).
pub fn decode_audio_chunk(data: &AudioChunkData) -> Result<Vec<u8>, String> {
    BASE64.decode(&data.chunk).map_err(|e| format!("invalid audio_chunk payload: {e}"))
}

/// Whether an accumulated transcript is long enough to treat `speech_end`
/// as an implicit submission.
pub fn should_submit_on_speech_end(accumulated: &str) -> bool {
    accumulated.trim().chars().count() >= IMPLICIT_SUBMIT_MIN_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(s: &str) -> AudioChunkData {
        AudioChunkData { chunk: s.to_string(), sample_rate: 16000, channels: 1 }
    }

    #[test]
    fn decodes_valid_base64() {
        let data = chunk("aGVsbG8=");
        assert_eq!(decode_audio_chunk(&data).unwrap(), b"hello");
    }

    #[test]
    fn rejects_invalid_base64() {
        let data = chunk("not base64!!");
        assert!(decode_audio_chunk(&data).is_err());
    }

    #[test]
    fn short_transcript_does_not_trigger_implicit_submit() {
        assert!(!should_submit_on_speech_end("uh"));
        assert!(!should_submit_on_speech_end("   "));
    }

    #[test]
    fn long_enough_transcript_triggers_implicit_submit() {
        assert!(should_submit_on_speech_end("I used a hashmap"));
    }

    #[test]
    fn boundary_length_is_inclusive() {
        assert!(should_submit_on_speech_end("0123456789"));
        assert!(!should_submit_on_speech_end("012345678"));
    }
}
