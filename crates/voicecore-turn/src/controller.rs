//! Drives one call's [`state::TurnState`] machine against live LLM/TTS
//! work, matching the teacher's run-loop convention (a free `run` function
//! owning a `tokio::select!` over an inbound event channel) rather than a
//! method-heavy object.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use voicecore_config::ModelTiers;
use voicecore_core::audio::AudioFrame;
use voicecore_core::ids::{CallId, TurnId, UtteranceId};
use voicecore_core::turn::{ConversationHistory, ConversationTurn, TurnRole};
use voicecore_events::{Event, EventBus};
use voicecore_llm::{
    dispatch, select_tier, CompletionRequest, ComplexityFactors, InferenceConfig, LlmEndpointConfig,
};
use voicecore_tts::{run_queue, TtsEndpointConfig};

use crate::context::{assemble_messages, system_preamble, AgentProfile};
use crate::state::{transition, Action, TurnEvent, TurnState, VoicedRunTracker, UTTERANCE_LOST_GRACE};

pub struct TurnControllerConfig {
    pub silence_timeout: Duration,
    pub model_tiers: ModelTiers,
    pub fallback_utterance: String,
    pub llm: LlmEndpointConfig,
    pub tts: TtsEndpointConfig,
    pub default_voice_id: String,
    pub known_voice_ids: Vec<String>,
}

/// Spawn the turn controller for one call. Returns a sender other stage
/// workers (Audio Ingress, STT Client) push [`TurnEvent`]s into, and a
/// receiver of the agent's outbound audio frames destined for Audio Egress.
pub fn spawn(
    call_id: CallId,
    profile: AgentProfile,
    config: TurnControllerConfig,
    bus: EventBus,
    cancel: CancellationToken,
) -> (mpsc::Sender<TurnEvent>, mpsc::Receiver<AudioFrame>) {
    let (event_tx, event_rx) = mpsc::channel(64);
    let (frames_tx, frames_rx) = mpsc::channel(64);
    let internal_tx = event_tx.clone();
    tokio::spawn(run(call_id, profile, config, bus, event_rx, internal_tx, frames_tx, cancel));
    (event_tx, frames_rx)
}

async fn run(
    call_id: CallId,
    profile: AgentProfile,
    config: TurnControllerConfig,
    bus: EventBus,
    mut event_rx: mpsc::Receiver<TurnEvent>,
    internal_tx: mpsc::Sender<TurnEvent>,
    frames_tx: mpsc::Sender<AudioFrame>,
    cancel: CancellationToken,
) {
    let mut state = TurnState::Greeting;
    let history = Arc::new(Mutex::new(ConversationHistory::new(50, 8_000)));
    let mut voiced_tracker = VoicedRunTracker::new();
    let mut last_voice_activity = Instant::now();
    let mut turn_cancel = cancel.child_token();
    let mut active_turn_id: Option<TurnId> = None;

    // Tracks the utterance currently awaiting a final transcript: the
    // highest-confidence interim seen so far (the `UtteranceLost` fallback)
    // and the id it carries for correlating the bus event (spec §7).
    let mut current_utterance_id: Option<UtteranceId> = None;
    let mut best_interim: Option<(f32, String)> = None;
    let mut awaiting_since: Option<Instant> = None;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => TurnEvent::EndCall,
            received = event_rx.recv() => match received {
                Some(TurnEvent::VoiceActivityStarted { .. }) => {
                    let voiced_ms = voiced_tracker.on_voiced_frame();
                    last_voice_activity = Instant::now();
                    TurnEvent::VoiceActivityStarted { voiced_ms }
                }
                Some(TurnEvent::TranscriptInterim { utterance_id, text, confidence }) => {
                    current_utterance_id = Some(utterance_id.clone());
                    if best_interim.as_ref().map_or(true, |(best, _)| confidence > *best) {
                        best_interim = Some((confidence, text.clone()));
                    }
                    TurnEvent::TranscriptInterim { utterance_id, text, confidence }
                }
                Some(other) => {
                    voiced_tracker.reset();
                    other
                }
                None => TurnEvent::EndCall,
            },
            _ = tokio::time::sleep(config.silence_timeout), if state == TurnState::UserSpeaking => {
                if last_voice_activity.elapsed() >= config.silence_timeout {
                    TurnEvent::SilenceTimeout
                } else {
                    continue;
                }
            },
            _ = tokio::time::sleep(UTTERANCE_LOST_GRACE), if state == TurnState::AwaitingFinal => {
                if awaiting_since.map_or(false, |since| since.elapsed() >= UTTERANCE_LOST_GRACE) {
                    TurnEvent::UtteranceLost { fallback_text: best_interim.take().map(|(_, text)| text) }
                } else {
                    continue;
                }
            },
        };

        let Some((next_state, action)) = transition(state, &event) else {
            continue;
        };
        state = next_state;

        if let TurnEvent::UtteranceLost { .. } = &event {
            if let Some(utterance_id) = current_utterance_id.clone() {
                bus.publish(Event::UtteranceLost { call_id: call_id.clone(), utterance_id });
            }
        }
        if matches!(event, TurnEvent::UtteranceFinal { .. } | TurnEvent::UtteranceLost { .. }) {
            current_utterance_id = None;
            best_interim = None;
            awaiting_since = None;
        }
        if matches!(event, TurnEvent::VoiceActivityEnded) && state == TurnState::AwaitingFinal {
            awaiting_since = Some(Instant::now());
        }

        match action {
            Action::None => {}
            Action::EmitGreetingDone => {}
            Action::EmitUserSilent => {
                tracing::info!(call_id = %call_id, "user silent, returning to listening");
            }
            Action::DispatchLlm => {
                let text = match &event {
                    TurnEvent::UtteranceFinal { text } => text.clone(),
                    TurnEvent::UtteranceLost { fallback_text: Some(text) } => text.clone(),
                    _ => String::new(),
                };

                let turn_id = TurnId::new();
                {
                    let mut guard = history.lock();
                    guard.push(ConversationTurn::open(TurnRole::User, text.clone()));
                }
                active_turn_id = Some(turn_id.clone());

                turn_cancel = cancel.child_token();
                bus.publish(Event::TurnOpened { call_id: call_id.clone(), turn_id: turn_id.clone(), role: "agent" });

                // The Thinking -> AgentSpeaking transition waits on the LLM
                // Dispatcher's real first-token signal, looped back here
                // through `internal_tx` by `spawn_agent_turn` — not fired
                // the instant dispatch is issued.
                spawn_agent_turn(
                    call_id.clone(),
                    turn_id,
                    &profile,
                    &config,
                    history.clone(),
                    text,
                    bus.clone(),
                    internal_tx.clone(),
                    frames_tx.clone(),
                    turn_cancel.clone(),
                );
            }
            Action::BeginStreamingToTts => {
                tracing::debug!(call_id = %call_id, "llm first token, streaming to tts");
            }
            Action::SpeakFallback => {
                if let Some(turn_id) = active_turn_id.clone() {
                    bus.publish(Event::TurnFailed { call_id: call_id.clone(), turn_id: turn_id.clone(), kind: "llm_failed" });
                    speak_fallback(
                        &config,
                        call_id.clone(),
                        turn_id,
                        history.clone(),
                        bus.clone(),
                        internal_tx.clone(),
                        frames_tx.clone(),
                        turn_cancel.clone(),
                    );
                }
            }
            Action::CloseAgentTurn => {
                if let Some(turn_id) = active_turn_id.take() {
                    let mut guard = history.lock();
                    if let Some(turn) = guard.turn_mut(&turn_id) {
                        turn.close();
                    }
                    bus.publish(Event::TurnClosed { call_id: call_id.clone(), turn_id, role: "agent", interrupted: false });
                }
            }
            Action::CancelAndBargeIn => {
                turn_cancel.cancel();
                if let Some(turn_id) = active_turn_id.take() {
                    let mut guard = history.lock();
                    if let Some(turn) = guard.turn_mut(&turn_id) {
                        turn.interrupt();
                    }
                    drop(guard);
                    bus.publish(Event::TurnInterrupted { call_id: call_id.clone(), turn_id: turn_id.clone() });
                    bus.publish(Event::TurnClosed { call_id: call_id.clone(), turn_id, role: "agent", interrupted: true });
                }
            }
            Action::Teardown => {
                turn_cancel.cancel();
                return;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_agent_turn(
    call_id: CallId,
    turn_id: TurnId,
    profile: &AgentProfile,
    config: &TurnControllerConfig,
    history: Arc<Mutex<ConversationHistory>>,
    utterance: String,
    bus: EventBus,
    completion_tx: mpsc::Sender<TurnEvent>,
    frames_tx: mpsc::Sender<AudioFrame>,
    turn_cancel: CancellationToken,
) {
    let (factors, preamble, messages) = {
        let mut guard = history.lock();
        let turn_count = guard.turn_count();
        let factors = ComplexityFactors::from_utterance(&utterance, turn_count);
        let preamble = system_preamble(profile, turn_count);
        let (messages, _pruned) = assemble_messages(&mut guard, &utterance);
        // The agent's own reply turn is recorded only now, empty, so it
        // never appears as a message in its own prompt; its text and
        // token counts are filled in once the response is complete.
        guard.push(ConversationTurn::open_with_id(turn_id.clone(), TurnRole::Agent, String::new()));
        (factors, preamble, messages)
    };

    let score = factors.score();
    let tier = select_tier(score, false, false, false);
    bus.publish(Event::ModelSelected {
        call_id: call_id.clone(),
        turn_id: turn_id.clone(),
        tier: tier.as_str(),
        complexity: score,
    });

    let request = CompletionRequest {
        model: tier.model_id(&config.model_tiers).to_string(),
        system: preamble,
        messages,
        inference_config: InferenceConfig { max_tokens: tier.max_tokens(&config.model_tiers), temperature: 0.7 },
        tools: Vec::new(),
        stream: true,
    };

    let llm_config = config.llm.clone();
    let tts_config = config.tts.clone();
    let default_voice_id = config.default_voice_id.clone();
    let known_voice_ids = config.known_voice_ids.clone();

    tokio::spawn(async move {
        let (sentences_tx, sentences_rx) = mpsc::channel(16);
        let (first_token_tx, mut first_token_rx) = mpsc::channel::<()>(1);
        let client = reqwest::Client::new();

        // Forwards the dispatcher's real first-token signal into the turn
        // machine's own event channel; a no-op once the turn has already
        // left Thinking (e.g. a retried stream re-announcing first token).
        let first_token_forward_tx = completion_tx.clone();
        tokio::spawn(async move {
            if first_token_rx.recv().await.is_some() {
                let _ = first_token_forward_tx.send(TurnEvent::LlmFirstToken).await;
            }
        });

        let tts_call_id = call_id.clone();
        let tts_turn_id = turn_id.clone();
        let tts_bus = bus.clone();
        let tts_cancel = turn_cancel.clone();
        let tts_frames_tx = frames_tx.clone();
        let tts_task = tokio::spawn(async move {
            run_queue(
                tts_config,
                tts_call_id,
                tts_turn_id,
                tts_bus,
                default_voice_id,
                known_voice_ids,
                sentences_rx,
                tts_frames_tx,
                tts_cancel,
            )
            .await;
        });

        let outcome = dispatch(
            &client,
            &llm_config,
            &request,
            call_id.clone(),
            turn_id.clone(),
            bus.clone(),
            sentences_tx,
            first_token_tx,
            turn_cancel.clone(),
        )
        .await;

        let _ = tts_task.await;

        if turn_cancel.is_cancelled() {
            tracing::debug!(call_id = %call_id, "llm/tts work cancelled by barge-in");
            return;
        }

        let signal = match outcome {
            Ok(result) => {
                let mut guard = history.lock();
                if let Some(turn) = guard.turn_mut(&turn_id) {
                    turn.text = result.full_text;
                    turn.tokens_in = result.tokens_in;
                    turn.tokens_out = result.tokens_out;
                    turn.model_id = Some(tier.as_str().to_string());
                }
                TurnEvent::TtsComplete
            }
            Err(err) => {
                tracing::warn!(call_id = %call_id, error = %err, "llm dispatch failed, speaking fallback");
                TurnEvent::LlmFailed
            }
        };
        let _ = completion_tx.send(signal).await;
    });
}

#[allow(clippy::too_many_arguments)]
fn speak_fallback(
    config: &TurnControllerConfig,
    call_id: CallId,
    turn_id: TurnId,
    history: Arc<Mutex<ConversationHistory>>,
    bus: EventBus,
    completion_tx: mpsc::Sender<TurnEvent>,
    frames_tx: mpsc::Sender<AudioFrame>,
    turn_cancel: CancellationToken,
) {
    let tts_config = config.tts.clone();
    let default_voice_id = config.default_voice_id.clone();
    let known_voice_ids = config.known_voice_ids.clone();
    let fallback_text = config.fallback_utterance.clone();

    {
        let mut guard = history.lock();
        if let Some(turn) = guard.turn_mut(&turn_id) {
            turn.text = fallback_text.clone();
        }
    }

    tokio::spawn(async move {
        let (sentences_tx, sentences_rx) = mpsc::channel(4);
        let _ = sentences_tx.send(fallback_text).await;
        drop(sentences_tx);
        run_queue(
            tts_config,
            call_id.clone(),
            turn_id,
            bus,
            default_voice_id,
            known_voice_ids,
            sentences_rx,
            frames_tx,
            turn_cancel.clone(),
        )
        .await;
        if !turn_cancel.is_cancelled() {
            let _ = completion_tx.send(TurnEvent::TtsComplete).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use voicecore_core::ids::CallId;
    use voicecore_events::{EventBus, NdjsonSink};

    #[test]
    fn turn_controller_config_carries_silence_timeout() {
        let config = TurnControllerConfig {
            silence_timeout: Duration::from_secs(8),
            model_tiers: ModelTiers::default(),
            fallback_utterance: "sorry, come again?".into(),
            llm: LlmEndpointConfig::new("https://example.invalid", "key"),
            tts: TtsEndpointConfig { endpoint: "https://example.invalid".into(), api_key: "key".into() },
            default_voice_id: "default".into(),
            known_voice_ids: vec!["default".into()],
        };
        assert_eq!(config.silence_timeout, Duration::from_secs(8));
    }

    fn test_config() -> TurnControllerConfig {
        TurnControllerConfig {
            silence_timeout: Duration::from_secs(8),
            model_tiers: ModelTiers::default(),
            fallback_utterance: "sorry, come again?".into(),
            llm: LlmEndpointConfig::new("https://example.invalid", "key"),
            tts: TtsEndpointConfig { endpoint: "https://example.invalid".into(), api_key: "key".into() },
            default_voice_id: "default".into(),
            known_voice_ids: vec!["default".into()],
        }
    }

    fn test_profile() -> AgentProfile {
        AgentProfile { name: "Ava".into(), persona_preamble: "Be concise and warm.".into() }
    }

    fn capturing_bus() -> (EventBus, Arc<StdMutex<Vec<String>>>) {
        let lines = Arc::new(StdMutex::new(Vec::new()));
        let lines_clone = lines.clone();
        let sink = Arc::new(NdjsonSink::new(move |line: String| {
            lines_clone.lock().unwrap().push(line);
        }));
        (EventBus::spawn(sink, 16), lines)
    }

    #[tokio::test]
    async fn voice_activity_ended_does_not_dispatch_before_the_final_transcript_arrives() {
        let (bus, lines) = capturing_bus();
        let cancel = CancellationToken::new();
        let (event_tx, _frames_rx) = spawn(CallId::new(), test_profile(), test_config(), bus, cancel.clone());

        event_tx.send(TurnEvent::GreetingComplete).await.unwrap();
        event_tx.send(TurnEvent::VoiceActivityStarted { voiced_ms: 0 }).await.unwrap();
        event_tx.send(TurnEvent::VoiceActivityEnded).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let captured = lines.lock().unwrap().join("\n");
        assert!(
            !captured.contains("turn_opened"),
            "VoiceActivityEnded alone must not dispatch an empty utterance: {captured}"
        );

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn utterance_lost_with_no_interim_returns_to_listening_without_dispatching() {
        let (bus, lines) = capturing_bus();
        let cancel = CancellationToken::new();
        let (event_tx, _frames_rx) = spawn(CallId::new(), test_profile(), test_config(), bus, cancel.clone());

        event_tx.send(TurnEvent::GreetingComplete).await.unwrap();
        event_tx.send(TurnEvent::VoiceActivityStarted { voiced_ms: 0 }).await.unwrap();
        event_tx.send(TurnEvent::VoiceActivityEnded).await.unwrap();

        tokio::time::advance(UTTERANCE_LOST_GRACE + Duration::from_millis(50)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let captured = lines.lock().unwrap().join("\n");
        assert!(captured.contains("utterance_lost"), "expected an UtteranceLost event: {captured}");
        assert!(!captured.contains("turn_opened"), "no interim was seen, so no LLM turn should open: {captured}");

        cancel.cancel();
    }
}
