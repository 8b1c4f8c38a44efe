//! Audio Ingress worker: VAD + jitter buffer over the inbound frame stream
//! (spec §4.3).

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use voicecore_config::Settings;
use voicecore_core::audio::AudioFrame;
use voicecore_core::ids::CallId;
use voicecore_events::{Event, EventBus};

use crate::jitter::JitterBuffer;
use crate::preroll::{PrerollBuffer, DEFAULT_PREROLL_MS};
use crate::vad::{VadTransition, VoiceActivityDetector};

/// Event the Turn Controller reacts to, alongside the filtered frame stream
/// forwarded to STT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceActivity {
    Started,
    Ended,
}

/// One inbound frame worth of ingress output.
pub enum IngressOutput {
    /// Forwarded toward STT: either pre-roll context or live speech.
    Frame(AudioFrame),
    Activity(VoiceActivity),
}

/// Drives VAD + jitter buffering for a single call's inbound audio.
///
/// `frames_in` receives raw frames from the telephony transport;
/// `output` carries forwarded frames and voice-activity events toward
/// STT/Turn Controller. Suppresses silence-only frames between utterances,
/// per spec §4.3.
pub async fn run_ingress(
    call_id: CallId,
    settings: Settings,
    bus: EventBus,
    mut frames_in: mpsc::Receiver<AudioFrame>,
    output: mpsc::Sender<IngressOutput>,
    cancel: CancellationToken,
) {
    let vad = VoiceActivityDetector::new(&settings.vad);
    let mut jitter = JitterBuffer::new(settings.jitter_target_ms);
    let mut preroll = PrerollBuffer::new(DEFAULT_PREROLL_MS);
    let mut forwarding = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            maybe_frame = frames_in.recv() => {
                let Some(frame) = maybe_frame else { break };
                let drop_report = jitter.push(frame, |f| !f.is_silence_byte_only());
                if drop_report.dropped > 0 {
                    bus.publish(Event::IngressDrop { call_id: call_id.clone(), frames: drop_report.dropped });
                }
                // One push releases at most one frame, matching the rate frames
                // actually arrive at; draining to empty here would undo the
                // buffering `jitter` exists to provide.
                if let Some(frame) = jitter.pop() {
                    let transition = vad.process(&frame);
                    match transition {
                        VadTransition::Started => {
                            forwarding = true;
                            for ctx_frame in preroll.drain() {
                                if output.send(IngressOutput::Frame(ctx_frame)).await.is_err() {
                                    return;
                                }
                            }
                            if output.send(IngressOutput::Activity(VoiceActivity::Started)).await.is_err() {
                                return;
                            }
                            if output.send(IngressOutput::Frame(frame)).await.is_err() {
                                return;
                            }
                        }
                        VadTransition::Ended => {
                            forwarding = false;
                            if output.send(IngressOutput::Activity(VoiceActivity::Ended)).await.is_err() {
                                return;
                            }
                        }
                        VadTransition::None => {
                            if forwarding {
                                if output.send(IngressOutput::Frame(frame)).await.is_err() {
                                    return;
                                }
                            } else {
                                preroll.push(frame);
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicecore_core::audio::{Direction, CANONICAL_FRAME_BYTES};
    use voicecore_events::TracingSink;

    fn loud_frame(seq: u64) -> AudioFrame {
        let mut payload = Vec::with_capacity(CANONICAL_FRAME_BYTES);
        for i in 0..CANONICAL_FRAME_BYTES {
            payload.push(if i % 2 == 0 { 0x0F } else { 0x8F });
        }
        AudioFrame::new(seq, payload, Direction::Inbound)
    }

    fn test_settings() -> Settings {
        Settings {
            stt_api_key: "k".into(),
            llm_credentials: "k".into(),
            tts_api_key: "k".into(),
            default_voice_id: "default".into(),
            fallback_utterance_text: "sorry, could you repeat that?".into(),
            max_call_seconds: 3600,
            silence_timeout_seconds: 8,
            jitter_target_ms: 50,
            jitter_max_ms: 200,
            vad: voicecore_config::VadSettings::default(),
            model_tiers: voicecore_config::ModelTiers::default(),
            history: voicecore_config::HistorySettings::default(),
            event_sink: voicecore_config::EventSinkSettings::default(),
            server: voicecore_config::ServerSettings::default(),
            stt_endpoint: None,
            llm_endpoint: None,
            tts_endpoint: None,
        }
    }

    #[tokio::test]
    async fn forwards_activity_started_after_hysteresis() {
        let settings = test_settings();
        let bus = EventBus::spawn(std::sync::Arc::new(TracingSink), 16);
        let (frames_tx, frames_rx) = mpsc::channel(16);
        let (out_tx, mut out_rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let call_id = CallId::new();

        let handle = tokio::spawn(run_ingress(
            call_id,
            settings,
            bus,
            frames_rx,
            out_tx,
            cancel.clone(),
        ));

        for seq in 0..3 {
            frames_tx.send(loud_frame(seq)).await.unwrap();
        }
        drop(frames_tx);

        let mut saw_started = false;
        while let Some(event) = out_rx.recv().await {
            if let IngressOutput::Activity(VoiceActivity::Started) = event {
                saw_started = true;
            }
        }
        assert!(saw_started);
        cancel.cancel();
        let _ = handle.await;
    }
}
