//! Drains sentences from the LLM Dispatcher into sequential TTS requests,
//! publishing `SynthesisFailed` on a per-sentence error and then moving on
//! to the next sentence rather than aborting the whole turn (spec §4.7).

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use voicecore_core::audio::AudioFrame;
use voicecore_core::ids::{CallId, TurnId};
use voicecore_events::{Event, EventBus};

use crate::client::synthesize;

#[derive(Debug, Clone)]
pub struct TtsEndpointConfig {
    pub endpoint: String,
    pub api_key: String,
}

/// Consume `sentences_rx` one sentence at a time until the channel closes or
/// `cancel` fires. Queued, not-yet-started sentences are simply dropped when
/// cancellation fires — they were never dequeued.
pub async fn run_queue(
    config: TtsEndpointConfig,
    call_id: CallId,
    turn_id: TurnId,
    bus: EventBus,
    default_voice_id: String,
    known_voice_ids: Vec<String>,
    mut sentences_rx: mpsc::Receiver<String>,
    frames_tx: mpsc::Sender<AudioFrame>,
    cancel: CancellationToken,
) {
    let client = reqwest::Client::new();

    loop {
        let sentence = tokio::select! {
            _ = cancel.cancelled() => return,
            sentence = sentences_rx.recv() => match sentence {
                Some(s) => s,
                None => return,
            },
        };

        let voice = crate::voice::resolve_voice(&default_voice_id, None, &known_voice_ids);

        let result = synthesize(
            &client,
            &config.endpoint,
            &config.api_key,
            &sentence,
            &voice,
            call_id.clone(),
            turn_id.clone(),
            bus.clone(),
            frames_tx.clone(),
            &cancel,
        )
        .await;

        if let Err(err) = result {
            if matches!(err, crate::error::TtsError::Cancelled) && cancel.is_cancelled() {
                return;
            }
            bus.publish(Event::SynthesisFailed {
                call_id: call_id.clone(),
                turn_id: turn_id.clone(),
                reason: err.to_string(),
            });
        }
    }
}
