//! Provider wire protocol for the STT duplex connection (spec §6.2).

use serde::{Deserialize, Serialize};

use crate::config::SttConfig;

#[derive(Debug, Serialize)]
struct HandshakeAudioOptions<'a> {
    encoding: &'a str,
    sample_rate: u32,
    channels: u8,
}

#[derive(Debug, Serialize)]
pub struct HandshakePayload<'a> {
    api_key: &'a str,
    audio: HandshakeAudioOptions<'a>,
    interim_results: bool,
    utterances: bool,
    vad_events: bool,
    endpointing_ms: u32,
    utterance_end_ms: u32,
    smart_format: bool,
    numerals: bool,
    filler_words: bool,
    detect_language: bool,
    language: &'a str,
    redact: &'a [String],
}

impl<'a> HandshakePayload<'a> {
    pub fn from_config(config: &'a SttConfig) -> Self {
        Self {
            api_key: &config.api_key,
            audio: HandshakeAudioOptions {
                encoding: config.encoding,
                sample_rate: config.sample_rate,
                channels: config.channels,
            },
            interim_results: config.interim_results,
            utterances: config.utterances,
            vad_events: config.vad_events,
            endpointing_ms: config.endpointing_ms,
            utterance_end_ms: config.utterance_end_ms,
            smart_format: config.smart_format,
            numerals: config.numerals,
            filler_words: config.filler_words,
            detect_language: config.detect_language,
            language: &config.language_hint,
            redact: &config.redact,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("handshake payload is always serializable")
    }
}

/// Zero-payload keep-alive heartbeat sent every 5 s (spec §4.4).
pub fn keep_alive_json() -> String {
    serde_json::json!({ "type": "keep_alive" }).to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Interim { text: String, confidence: f32, start_ms: u64, duration_ms: u64 },
    Final { text: String, confidence: f32, start_ms: u64, duration_ms: u64, language: Option<String> },
    SpeechStarted,
    UtteranceEnd,
    Warning { message: String },
    Error { message: String, retriable: bool },
    Metadata { request_id: String },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum WireError {
    #[error("invalid stt server event: {0}")]
    InvalidJson(String),
}

impl ServerEvent {
    pub fn parse(text: &str) -> Result<Self, WireError> {
        serde_json::from_str(text).map_err(|e| WireError::InvalidJson(e.to_string()))
    }
}

/// Outbound binary audio frame: raw μ-law bytes, sent as a websocket binary
/// message (not base64-wrapped — base64 is only used in the telephony
/// provider's JSON envelope, not here).
pub fn audio_message(payload: &[u8]) -> Vec<u8> {
    payload.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_carries_fixed_audio_options() {
        let config = SttConfig::new("wss://stt.example", "key");
        let payload = HandshakePayload::from_config(&config).to_json();
        assert!(payload.contains("\"encoding\":\"mulaw\""));
        assert!(payload.contains("\"sample_rate\":8000"));
    }

    #[test]
    fn parses_final_event() {
        let json = serde_json::json!({
            "type": "final",
            "text": "hello there",
            "confidence": 0.95,
            "start_ms": 0,
            "duration_ms": 420,
            "language": "en-US"
        })
        .to_string();
        match ServerEvent::parse(&json).unwrap() {
            ServerEvent::Final { text, confidence, .. } => {
                assert_eq!(text, "hello there");
                assert!(confidence > 0.9);
            }
            other => panic!("expected final, got {other:?}"),
        }
    }
}
