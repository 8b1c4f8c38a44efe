//! Vendor-neutral streaming chat-completion wire contract (spec §6.3).
//!
//! Shaped like the "converse" style several hosted LLM APIs converge on:
//! a system string, a role-tagged message list, an inference-config block,
//! optional tool definitions, and a server-sent-events stream of content
//! deltas terminated by a usage-bearing stop event. No concrete vendor's
//! model identifiers or headers are hardcoded here — those live in the
//! caller-supplied [`crate::config::LlmEndpointConfig`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InferenceConfig {
    pub max_tokens: usize,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub inference_config: InferenceConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    pub stream: bool,
}

/// One decoded server-sent-event payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart,
    ContentBlockDelta { text: String },
    ToolUseDelta { name: String, partial_input: String },
    MessageStop { stop_reason: StopReason, usage: Usage },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Parse one `data: {...}` SSE line's JSON payload. Callers are expected to
/// have already stripped the `data: ` prefix and skipped `[DONE]` markers.
pub fn parse_event(json: &str) -> Result<StreamEvent, serde_json::Error> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_without_tools_field_when_empty() {
        let req = CompletionRequest {
            model: "tier-mid".into(),
            system: "you are helpful".into(),
            messages: vec![Message { role: Role::User, content: "hi".into() }],
            inference_config: InferenceConfig { max_tokens: 256, temperature: 0.7 },
            tools: vec![],
            stream: true,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("\"tools\""));
    }

    #[test]
    fn parses_content_block_delta() {
        let json = serde_json::json!({ "type": "content_block_delta", "text": "hi" }).to_string();
        match parse_event(&json).unwrap() {
            StreamEvent::ContentBlockDelta { text } => assert_eq!(text, "hi"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
