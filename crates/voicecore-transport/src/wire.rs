//! Telephony provider wire format (spec §6.1).
//!
//! The provider speaks a persistent duplex socket carrying JSON control
//! messages and base64-encoded binary audio payloads keyed by event type.
//! This module only decodes/encodes the shapes the core consumes — it is
//! deliberately lenient about unknown fields (`#[serde(default)]` /
//! untagged fallbacks are avoided in favor of explicit `Unknown` handling in
//! [`InboundMessage::parse`]) since providers routinely add fields.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct StartMetadata {
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub caller_number: Option<String>,
    #[serde(default)]
    pub called_number: Option<String>,
}

#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// Session handshake; carries the provider-assigned call id, recorded
    /// but never used as the primary `CallId` (spec §6.1).
    Connected { provider_call_id: String },
    Start { metadata: StartMetadata },
    Media { payload: Vec<u8> },
    Dtmf { digit: char, timestamp_ms: u64 },
    Stop,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum WireError {
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
    #[error("unrecognized event type: {0}")]
    UnrecognizedEvent(String),
    #[error("malformed message: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    event: String,
    #[serde(default)]
    #[serde(rename = "streamSid")]
    stream_sid: Option<String>,
    #[serde(default)]
    media: Option<RawMedia>,
    #[serde(default)]
    start: Option<StartMetadata>,
    #[serde(default)]
    dtmf: Option<RawDtmf>,
}

#[derive(Debug, Deserialize)]
struct RawMedia {
    payload: String,
}

#[derive(Debug, Deserialize)]
struct RawDtmf {
    digit: String,
    #[serde(default)]
    timestamp: u64,
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self, WireError> {
        let env: RawEnvelope =
            serde_json::from_str(text).map_err(|e| WireError::InvalidJson(e.to_string()))?;
        match env.event.as_str() {
            "connected" => Ok(InboundMessage::Connected {
                provider_call_id: env.stream_sid.unwrap_or_default(),
            }),
            "start" => Ok(InboundMessage::Start {
                metadata: env.start.unwrap_or(StartMetadata {
                    codec: None,
                    caller_number: None,
                    called_number: None,
                }),
            }),
            "media" => {
                let media = env
                    .media
                    .ok_or_else(|| WireError::Malformed("media event missing payload".into()))?;
                let payload = BASE64
                    .decode(media.payload)
                    .map_err(|e| WireError::InvalidBase64(e.to_string()))?;
                Ok(InboundMessage::Media { payload })
            }
            "dtmf" => {
                let dtmf = env
                    .dtmf
                    .ok_or_else(|| WireError::Malformed("dtmf event missing digit".into()))?;
                let digit = dtmf
                    .digit
                    .chars()
                    .next()
                    .ok_or_else(|| WireError::Malformed("empty dtmf digit".into()))?;
                Ok(InboundMessage::Dtmf { digit, timestamp_ms: dtmf.timestamp })
            }
            "stop" => Ok(InboundMessage::Stop),
            other => Err(WireError::UnrecognizedEvent(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub enum OutboundMessage {
    Media { payload: Vec<u8> },
    Clear,
    Mark { name: String },
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum RawOutbound<'a> {
    Media { media: RawOutboundMedia },
    Clear,
    Mark { mark: RawMark<'a> },
}

#[derive(Serialize)]
struct RawOutboundMedia {
    payload: String,
}

#[derive(Serialize)]
struct RawMark<'a> {
    name: &'a str,
}

impl OutboundMessage {
    pub fn to_json(&self) -> String {
        let raw = match self {
            OutboundMessage::Media { payload } => RawOutbound::Media {
                media: RawOutboundMedia { payload: BASE64.encode(payload) },
            },
            OutboundMessage::Clear => RawOutbound::Clear,
            OutboundMessage::Mark { name } => RawOutbound::Mark { mark: RawMark { name } },
        };
        serde_json::to_string(&raw).expect("outbound telephony message is always serializable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_media_event() {
        let json = serde_json::json!({
            "event": "media",
            "media": { "payload": BASE64.encode([0xFFu8; 160]) }
        })
        .to_string();
        match InboundMessage::parse(&json).unwrap() {
            InboundMessage::Media { payload } => assert_eq!(payload.len(), 160),
            _ => panic!("expected media"),
        }
    }

    #[test]
    fn rejects_unknown_event() {
        let json = serde_json::json!({ "event": "mystery" }).to_string();
        assert!(matches!(
            InboundMessage::parse(&json),
            Err(WireError::UnrecognizedEvent(_))
        ));
    }

    #[test]
    fn encodes_clear_message() {
        let msg = OutboundMessage::Clear.to_json();
        assert!(msg.contains("\"event\":\"clear\""));
    }

    #[test]
    fn round_trips_media_payload() {
        let payload = vec![0x12, 0x34, 0x56];
        let json = OutboundMessage::Media { payload: payload.clone() }.to_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let decoded = BASE64.decode(parsed["media"]["payload"].as_str().unwrap()).unwrap();
        assert_eq!(decoded, payload);
    }
}
