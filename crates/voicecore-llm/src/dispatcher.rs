//! Streaming LLM dispatch: issue the request, time-box the first token,
//! segment output into sentences, forward each to TTS (spec §4.6).

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use voicecore_core::ids::{CallId, TurnId};
use voicecore_events::{Event, EventBus};

use crate::config::{LlmEndpointConfig, FIRST_TOKEN_HARD_BUDGET, FIRST_TOKEN_SOFT_BUDGET};
use crate::error::LlmError;
use crate::sentence::SentenceExtractor;
use crate::wire::{CompletionRequest, StreamEvent, Usage};

pub struct DispatchOutcome {
    pub tokens_in: usize,
    pub tokens_out: usize,
    pub full_text: String,
}

/// Issue one streaming completion request, forwarding sentences to `sentences_tx`
/// as soon as each is complete. Retries once immediately on a retriable
/// network/5xx failure; a second failure propagates to the caller, which
/// is responsible for `TurnFailed` and the fallback utterance (spec §4.6).
///
/// `first_token_tx` is signalled the moment the first content chunk arrives,
/// alongside the `Event::LLMFirstToken` bus publish — the caller uses it to
/// learn the real first-token moment rather than guessing at dispatch time.
pub async fn dispatch(
    client: &reqwest::Client,
    config: &LlmEndpointConfig,
    request: &CompletionRequest,
    call_id: CallId,
    turn_id: TurnId,
    bus: EventBus,
    sentences_tx: mpsc::Sender<String>,
    first_token_tx: mpsc::Sender<()>,
    cancel: CancellationToken,
) -> Result<DispatchOutcome, LlmError> {
    match run_stream(client, config, request, &call_id, &turn_id, &bus, &sentences_tx, &first_token_tx, &cancel).await
    {
        Ok(outcome) => Ok(outcome),
        Err(err) if err.is_retriable() && !cancel.is_cancelled() => {
            tracing::warn!(call_id = %call_id, error = %err, "llm request failed, retrying once");
            run_stream(client, config, request, &call_id, &turn_id, &bus, &sentences_tx, &first_token_tx, &cancel)
                .await
        }
        Err(err) => Err(err),
    }
}

async fn run_stream(
    client: &reqwest::Client,
    config: &LlmEndpointConfig,
    request: &CompletionRequest,
    call_id: &CallId,
    turn_id: &TurnId,
    bus: &EventBus,
    sentences_tx: &mpsc::Sender<String>,
    first_token_tx: &mpsc::Sender<()>,
    cancel: &CancellationToken,
) -> Result<DispatchOutcome, LlmError> {
    let dispatched_at = Instant::now();
    let response = client
        .post(&config.endpoint)
        .bearer_auth(&config.credentials)
        .json(request)
        .send();

    let response = tokio::select! {
        _ = cancel.cancelled() => return Err(LlmError::Cancelled),
        result = response => result.map_err(|e| LlmError::Network(e.to_string()))?,
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Http { status: status.as_u16(), body });
    }

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();
    let mut extractor = SentenceExtractor::new();
    let mut full_text = String::new();
    let mut first_token_seen = false;
    let mut usage = Usage { input_tokens: 0, output_tokens: 0 };
    let soft_warn = tokio::time::sleep(FIRST_TOKEN_SOFT_BUDGET);
    let hard_timeout = tokio::time::sleep(FIRST_TOKEN_HARD_BUDGET);
    tokio::pin!(soft_warn);
    tokio::pin!(hard_timeout);
    let mut soft_warned = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            _ = &mut soft_warn, if !first_token_seen && !soft_warned => {
                soft_warned = true;
                bus.publish(Event::LLMSlowWarn { call_id: call_id.clone(), turn_id: turn_id.clone() });
            }
            _ = &mut hard_timeout, if !first_token_seen => {
                bus.publish(Event::LLMTimeout { call_id: call_id.clone(), turn_id: turn_id.clone() });
                return Err(LlmError::Timeout);
            }
            chunk = stream.next() => {
                let Some(chunk) = chunk else { break };
                let chunk = chunk.map_err(|e| LlmError::Network(e.to_string()))?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer.drain(..=line_end);
                    let Some(json_str) = line.strip_prefix("data: ") else { continue };
                    if json_str == "[DONE]" {
                        continue;
                    }
                    let event = crate::wire::parse_event(json_str)
                        .map_err(|e| LlmError::Malformed(e.to_string()))?;
                    match event {
                        StreamEvent::MessageStart => {}
                        StreamEvent::ContentBlockDelta { text } => {
                            if !first_token_seen {
                                first_token_seen = true;
                                bus.publish(Event::LLMFirstToken {
                                    call_id: call_id.clone(),
                                    turn_id: turn_id.clone(),
                                    latency_ms: dispatched_at.elapsed().as_millis() as u64,
                                });
                                let _ = first_token_tx.send(()).await;
                            }
                            full_text.push_str(&text);
                            for sentence in extractor.push(&text) {
                                if sentences_tx.send(sentence).await.is_err() {
                                    return Err(LlmError::Cancelled);
                                }
                            }
                        }
                        StreamEvent::ToolUseDelta { .. } => {}
                        StreamEvent::MessageStop { usage: u, .. } => {
                            usage = u;
                        }
                    }
                }
            }
        }
    }

    for sentence in extractor.finish() {
        if sentences_tx.send(sentence).await.is_err() {
            return Err(LlmError::Cancelled);
        }
    }

    bus.publish(Event::LLMCompleted {
        call_id: call_id.clone(),
        turn_id: turn_id.clone(),
        tokens_in: usage.input_tokens,
        tokens_out: usage.output_tokens,
    });

    Ok(DispatchOutcome { tokens_in: usage.input_tokens, tokens_out: usage.output_tokens, full_text })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_and_terminal_classification_matches_spec() {
        assert!(LlmError::Network("x".into()).is_retriable());
        assert!(LlmError::Http { status: 503, body: String::new() }.is_retriable());
        assert!(!LlmError::Http { status: 400, body: String::new() }.is_retriable());
        assert!(LlmError::Auth.is_terminal());
        assert!(LlmError::Quota.is_terminal());
    }
}
