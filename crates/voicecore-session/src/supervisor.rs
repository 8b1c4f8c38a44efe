//! Call Supervisor (spec §3 "Call Supervisor", §4.1): accepts one call at a
//! time, wires its stage workers together, and tears the whole tree down
//! atomically on hangup, deadline, or an unrecoverable stage failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use voicecore_config::Settings;
use voicecore_core::audio::AudioFrame;
use voicecore_core::ids::{AgentProfileId, CallId, TenantId, UtteranceId};
use voicecore_core::session::{CallMeta, SessionState};
use voicecore_events::{CallEndReason, Event, EventBus};
use voicecore_llm::LlmEndpointConfig;
use voicecore_stt::{SttConfig, SttEvent};
use voicecore_transport::{FrameEvent, RawDuplex, TransportSession};
use voicecore_tts::TtsEndpointConfig;
use voicecore_turn::{AgentProfile, TurnControllerConfig, TurnEvent};

use crate::error::SessionError;
use crate::registry::{CallHandle, CallRegistry, CallStatus};
use crate::stages::stt_failure_reason;

#[derive(Clone)]
pub struct CallSupervisor {
    settings: Arc<Settings>,
    bus: EventBus,
    registry: CallRegistry,
}

impl CallSupervisor {
    pub fn new(settings: Settings, bus: EventBus) -> Self {
        Self { settings: Arc::new(settings), bus, registry: CallRegistry::new() }
    }

    pub fn registry(&self) -> &CallRegistry {
        &self.registry
    }

    pub fn status(&self, call_id: &CallId) -> Option<CallStatus> {
        self.registry.status(call_id)
    }

    /// Accept a new call: build the full stage-worker tree over `duplex`
    /// and register it before returning. Spawning itself can't fail; a
    /// duplex that's already dead surfaces as an early `CallEnded` rather
    /// than an error here, matching the fire-and-forget shape of the rest
    /// of the event bus.
    pub fn accept_call<D>(
        &self,
        duplex: D,
        tenant_id: TenantId,
        agent_profile_id: AgentProfileId,
        profile: AgentProfile,
    ) -> CallId
    where
        D: RawDuplex + Send + 'static,
    {
        let mut meta = CallMeta::new(tenant_id, agent_profile_id);
        meta.hard_deadline = Duration::from_secs(self.settings.max_call_seconds);
        let call_id = meta.call_id.clone();
        let state = Arc::new(parking_lot::Mutex::new(SessionState::Initializing));
        let cancel = CancellationToken::new();
        let end_reason = Arc::new(parking_lot::Mutex::new(None));

        self.registry.insert(CallHandle {
            meta: meta.clone(),
            state: state.clone(),
            cancel: cancel.clone(),
            end_reason: end_reason.clone(),
        });
        self.bus.publish(Event::CallStarted { call_id: call_id.clone() });

        let supervisor = self.clone();
        tokio::spawn(async move {
            supervisor.run_call(duplex, meta, state, cancel, end_reason, profile).await;
        });

        call_id
    }

    /// Request early teardown (caller hangup detected upstream, or an
    /// operator/agent-initiated drop). The running call tree observes its
    /// cancellation token and unwinds itself; this does not block on that
    /// unwind (spec §3 "Call Session" — teardown is atomic but asynchronous).
    pub fn end_call(&self, call_id: &CallId, reason: CallEndReason) -> Result<(), SessionError> {
        if self.registry.cancel_with_reason(call_id, reason) {
            Ok(())
        } else {
            Err(SessionError::NotFound(call_id.clone()))
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_call<D>(
        &self,
        duplex: D,
        meta: CallMeta,
        state: Arc<parking_lot::Mutex<SessionState>>,
        cancel: CancellationToken,
        end_reason: Arc<parking_lot::Mutex<Option<CallEndReason>>>,
        profile: AgentProfile,
    ) where
        D: RawDuplex + Send + 'static,
    {
        let call_id = meta.call_id.clone();
        *state.lock() = SessionState::Ready;

        let (raw_in_tx, raw_in_rx) = mpsc::channel::<AudioFrame>(64);
        let (ingress_out_tx, mut ingress_out_rx) = mpsc::channel(64);
        let (stt_audio_tx, stt_audio_rx) = mpsc::channel::<Vec<u8>>(64);
        let (stt_events_tx, mut stt_events_rx) = mpsc::channel::<SttEvent>(64);
        let (_flush_tx, flush_rx) = mpsc::channel::<()>(4);
        let (to_transport_tx, to_transport_rx) = mpsc::channel::<AudioFrame>(64);

        let turn_config = TurnControllerConfig {
            silence_timeout: Duration::from_secs(self.settings.silence_timeout_seconds),
            model_tiers: self.settings.model_tiers.clone(),
            fallback_utterance: self.settings.fallback_utterance_text.clone(),
            llm: LlmEndpointConfig::new(
                self.settings.llm_endpoint.clone().unwrap_or_default(),
                self.settings.llm_credentials.clone(),
            ),
            tts: TtsEndpointConfig {
                endpoint: self.settings.tts_endpoint.clone().unwrap_or_default(),
                api_key: self.settings.tts_api_key.clone(),
            },
            default_voice_id: self.settings.default_voice_id.clone(),
            known_voice_ids: vec![self.settings.default_voice_id.clone()],
        };

        let (turn_event_tx, turn_frames_rx) =
            voicecore_turn::spawn(call_id.clone(), profile, turn_config, self.bus.clone(), cancel.child_token());

        *state.lock() = SessionState::Active;

        // Telephony Transport pump: the only task touching `duplex`, since
        // both read and write need `&mut self` on the same socket.
        // Non-restartable (spec §4.1) — any exit here tears the call down.
        let transport_call_id = call_id.clone();
        let transport_cancel = cancel.clone();
        let transport_task = tokio::spawn(async move {
            run_transport_pump(transport_call_id, duplex, raw_in_tx, to_transport_rx, transport_cancel).await;
        });

        // Audio Ingress: VAD + jitter buffer. Non-restartable.
        let ingress_cancel = cancel.child_token();
        let ingress_settings = (*self.settings).clone();
        let ingress_bus = self.bus.clone();
        let ingress_call_id = call_id.clone();
        tokio::spawn(async move {
            voicecore_audio::run_ingress(
                ingress_call_id,
                ingress_settings,
                ingress_bus,
                raw_in_rx,
                ingress_out_tx,
                ingress_cancel,
            )
            .await;
        });

        // Audio Egress: paces the Turn Controller's outbound frames to the
        // transport pump at real-time cadence. Non-restartable.
        let egress_cancel = cancel.child_token();
        let egress_bus = self.bus.clone();
        let egress_call_id = call_id.clone();
        tokio::spawn(async move {
            voicecore_audio::run_egress(egress_call_id, egress_bus, turn_frames_rx, flush_rx, to_transport_tx, egress_cancel)
                .await;
        });

        // Demux: Ingress output -> STT audio feed + VAD events to the Turn
        // Controller.
        let demux_turn_tx = turn_event_tx.clone();
        let demux_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = demux_cancel.cancelled() => break,
                    maybe = ingress_out_rx.recv() => {
                        let Some(output) = maybe else { break };
                        match output {
                            voicecore_audio::IngressOutput::Frame(frame) => {
                                if stt_audio_tx.send(frame.payload.to_vec()).await.is_err() {
                                    break;
                                }
                            }
                            voicecore_audio::IngressOutput::Activity(voicecore_audio::VoiceActivity::Started) => {
                                let _ = demux_turn_tx.send(TurnEvent::VoiceActivityStarted { voiced_ms: 0 }).await;
                            }
                            voicecore_audio::IngressOutput::Activity(voicecore_audio::VoiceActivity::Ended) => {
                                let _ = demux_turn_tx.send(TurnEvent::VoiceActivityEnded).await;
                            }
                        }
                    }
                }
            }
        });

        // STT client. `run` owns the audio/event channel endpoints for its
        // whole lifetime and retries the provider connection internally;
        // see `stages::stt_failure_reason` for why there is no outer
        // restart wrapper around it.
        let stt_cancel = cancel.child_token();
        let stt_root_cancel = cancel.clone();
        let stt_end_reason = end_reason.clone();
        let stt_bus = self.bus.clone();
        let stt_call_id = call_id.clone();
        let stt_config =
            SttConfig::new(self.settings.stt_endpoint.clone().unwrap_or_default(), self.settings.stt_api_key.clone());
        tokio::spawn(async move {
            let outcome =
                voicecore_stt::run(stt_config, stt_call_id.clone(), stt_bus.clone(), stt_audio_rx, stt_events_tx, stt_cancel)
                    .await;
            // Cancel the call's root token, not just this stage's child
            // token — an STT stage worker with nowhere left to go takes
            // the whole call down, not just itself. The actual
            // `CallEnded` publish happens once, in the teardown tail.
            if let Some((reason, cause)) = stt_failure_reason(outcome) {
                if !stt_root_cancel.is_cancelled() {
                    tracing::warn!(call_id = %stt_call_id, cause, "stt stage exhausted, ending call");
                    stt_bus.publish(Event::StageRestarted { call_id: stt_call_id.clone(), stage: "stt".to_string(), cause });
                    *stt_end_reason.lock() = Some(reason);
                    stt_root_cancel.cancel();
                }
            }
        });

        // STT events -> transcript bus events + Turn Controller utterances.
        let stt_demux_turn_tx = turn_event_tx.clone();
        let stt_demux_bus = self.bus.clone();
        let stt_demux_call_id = call_id.clone();
        let stt_demux_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut current_utterance = UtteranceId::new();
            loop {
                tokio::select! {
                    _ = stt_demux_cancel.cancelled() => break,
                    maybe = stt_events_rx.recv() => {
                        let Some(event) = maybe else { break };
                        match event {
                            SttEvent::Interim { text, confidence, .. } => {
                                stt_demux_bus.publish(Event::TranscriptInterim {
                                    call_id: stt_demux_call_id.clone(),
                                    utterance_id: current_utterance.clone(),
                                    text: text.clone(),
                                    confidence,
                                });
                                let _ = stt_demux_turn_tx
                                    .send(TurnEvent::TranscriptInterim {
                                        utterance_id: current_utterance.clone(),
                                        text,
                                        confidence,
                                    })
                                    .await;
                            }
                            SttEvent::Final { text, confidence, duration_ms, .. } => {
                                stt_demux_bus.publish(Event::TranscriptFinal {
                                    call_id: stt_demux_call_id.clone(),
                                    utterance_id: current_utterance.clone(),
                                    text: text.clone(),
                                    confidence,
                                    latency_ms: duration_ms,
                                });
                                let _ = stt_demux_turn_tx.send(TurnEvent::UtteranceFinal { text }).await;
                                current_utterance = UtteranceId::new();
                            }
                            SttEvent::SpeechStarted | SttEvent::UtteranceEnd => {}
                        }
                    }
                }
            }
        });

        // Hard deadline watchdog: the only path besides hangup/stage
        // failure allowed to cancel the call's root token directly rather
        // than only its own child (spec §4.1 hard deadline).
        let deadline_cancel = cancel.clone();
        let deadline_end_reason = end_reason.clone();
        let deadline_turn_tx = turn_event_tx.clone();
        let hard_deadline = meta.hard_deadline;
        tokio::spawn(async move {
            tokio::time::sleep(hard_deadline).await;
            if deadline_cancel.is_cancelled() {
                return;
            }
            *deadline_end_reason.lock() = Some(CallEndReason::Deadline);
            let _ = deadline_turn_tx.send(TurnEvent::DeadlineExpired).await;
            deadline_cancel.cancel();
        });

        // The opening greeting utterance itself is synthesized by the agent
        // profile's own first scripted turn once the call reaches
        // Listening, not played out here; this only unblocks the turn
        // machine's initial Greeting state so VAD can start being heard.
        let _ = turn_event_tx.send(TurnEvent::GreetingComplete).await;

        let _ = transport_task.await;
        cancel.cancel();
        *state.lock() = SessionState::Draining;
        tokio::time::sleep(voicecore_core::session::DEFAULT_GRACE_DRAIN).await;
        *state.lock() = SessionState::Ended;

        let reason = end_reason.lock().take().unwrap_or(CallEndReason::CallerHangup);
        // Agent-facing turn count lives inside the Turn Controller's own
        // private conversation history and isn't surfaced here; reported
        // as 0 until a dedicated metrics channel exists.
        self.bus.publish(Event::CallEnded {
            call_id: call_id.clone(),
            reason,
            duration_ms: meta.elapsed().as_millis() as u64,
            turn_count: 0,
        });
        self.registry.remove(&call_id);
    }
}

/// Pumps both directions of one call's telephony duplex: forwards inbound
/// frames to Audio Ingress, forwards outbound frames from Audio Egress to
/// the wire, and surfaces DTMF as an observation-only event (spec §9 open
/// question — DTMF never drives turn state).
async fn run_transport_pump<D: RawDuplex>(
    call_id: CallId,
    duplex: D,
    raw_in_tx: mpsc::Sender<AudioFrame>,
    mut to_transport_rx: mpsc::Receiver<AudioFrame>,
    cancel: CancellationToken,
) {
    let mut transport = TransportSession::new(duplex);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            outbound = to_transport_rx.recv() => {
                let Some(frame) = outbound else { break };
                if transport.send_frame(frame).await.is_err() {
                    break;
                }
            }
            inbound = transport.receive_frame() => {
                match inbound {
                    Ok(FrameEvent::Frame(frame)) => {
                        if raw_in_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Ok(FrameEvent::Dtmf { digit, .. }) => {
                        tracing::debug!(call_id = %call_id, digit = %digit, "dtmf received");
                    }
                    Ok(FrameEvent::StartInfo(_)) => {}
                    Ok(FrameEvent::EndOfStream) => break,
                    Err(err) => {
                        tracing::warn!(call_id = %call_id, error = %err, "transport read failed, ending call");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_timeout_setting_converts_to_duration_in_seconds() {
        let seconds = 8u64;
        assert_eq!(Duration::from_secs(seconds), Duration::from_millis(8_000));
    }
}
