//! `synthesize`/`cancel` operations against an external TTS provider
//! (spec §4.7). Streams response bytes where the provider supports it,
//! chunking the decoded μ-law payload into canonical 20 ms Audio Frames for
//! the Audio Egress worker.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use voicecore_core::audio::{AudioFrame, Direction, CANONICAL_FRAME_BYTES};
use voicecore_core::ids::{CallId, TurnId};
use voicecore_events::{Event, EventBus};

use crate::error::TtsError;
use crate::voice::ResolvedVoice;

pub const SENTENCE_SYNTHESIS_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[derive(Debug, Clone, serde::Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    encoding: &'static str,
    sample_rate: u32,
}

/// Synthesize one sentence, pushing canonical μ-law frames to `frames_tx` as
/// they become available and publishing `TTSFirstAudio`/`TTSCompleted`.
/// Honors `cancel` by dropping the in-flight request immediately.
pub async fn synthesize(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    sentence: &str,
    voice: &ResolvedVoice,
    call_id: CallId,
    turn_id: TurnId,
    bus: EventBus,
    frames_tx: mpsc::Sender<AudioFrame>,
    cancel: &CancellationToken,
) -> Result<(), TtsError> {
    if voice.fell_back {
        tracing::warn!(call_id = %call_id, requested_fallback = true, "tts voice id not recognized, using default");
    }

    let dispatched_at = tokio::time::Instant::now();
    let request = SynthesizeRequest { text: sentence, voice_id: &voice.voice_id, encoding: "mulaw", sample_rate: 8_000 };

    let send_fut = client.post(endpoint).bearer_auth(api_key).json(&request).send();
    let response = tokio::select! {
        _ = cancel.cancelled() => return Err(TtsError::Cancelled),
        _ = tokio::time::sleep(SENTENCE_SYNTHESIS_TIMEOUT) => return Err(TtsError::Timeout),
        result = send_fut => result.map_err(|e| TtsError::Network(e.to_string()))?,
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TtsError::Http { status: status.as_u16(), body });
    }

    let mut stream = response.bytes_stream();
    let mut pending = Vec::with_capacity(CANONICAL_FRAME_BYTES);
    let mut sequence = 0u64;
    let mut first_frame_sent = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Err(TtsError::Cancelled),
            chunk = stream.next() => {
                let Some(chunk) = chunk else { break };
                let chunk = chunk.map_err(|e| TtsError::Network(e.to_string()))?;
                pending.extend_from_slice(&chunk);
                while pending.len() >= CANONICAL_FRAME_BYTES {
                    let frame_bytes: Vec<u8> = pending.drain(..CANONICAL_FRAME_BYTES).collect();
                    let frame = AudioFrame::new(sequence, frame_bytes, Direction::Outbound);
                    sequence += 1;
                    if !first_frame_sent {
                        first_frame_sent = true;
                        bus.publish(Event::TTSFirstAudio {
                            call_id: call_id.clone(),
                            turn_id: turn_id.clone(),
                            latency_ms: dispatched_at.elapsed().as_millis() as u64,
                        });
                    }
                    if frames_tx.send(frame).await.is_err() {
                        return Err(TtsError::Cancelled);
                    }
                }
            }
        }
    }

    if !pending.is_empty() {
        pending.resize(CANONICAL_FRAME_BYTES, voicecore_core::audio::MULAW_SILENCE_BYTE);
        let frame = AudioFrame::new(sequence, pending, Direction::Outbound);
        let _ = frames_tx.send(frame).await;
    }

    bus.publish(Event::TTSCompleted { call_id, turn_id });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_frame_bytes_matches_telephony_frame_size() {
        assert_eq!(CANONICAL_FRAME_BYTES, 160);
    }
}
