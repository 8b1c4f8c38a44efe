//! Event kinds emitted by the core (spec §4.8).

use serde::{Deserialize, Serialize};
use voicecore_core::{CallId, TurnId, UtteranceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallEndReason {
    CallerHangup,
    AgentInitiated,
    Deadline,
    UnrecoverableFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Lifecycle
    CallStarted {
        call_id: CallId,
    },
    CallEnded {
        call_id: CallId,
        reason: CallEndReason,
        duration_ms: u64,
        turn_count: usize,
    },
    StageRestarted {
        call_id: CallId,
        stage: String,
        cause: String,
    },

    // Audio
    VoiceActivityStarted {
        call_id: CallId,
    },
    VoiceActivityEnded {
        call_id: CallId,
    },
    IngressDrop {
        call_id: CallId,
        frames: usize,
    },
    OutputUnderrun {
        call_id: CallId,
    },

    // STT
    TranscriptInterim {
        call_id: CallId,
        utterance_id: UtteranceId,
        text: String,
        confidence: f32,
    },
    TranscriptFinal {
        call_id: CallId,
        utterance_id: UtteranceId,
        text: String,
        confidence: f32,
        latency_ms: u64,
    },
    STTReconnected {
        call_id: CallId,
    },
    UtteranceLost {
        call_id: CallId,
        utterance_id: UtteranceId,
    },

    // Turn
    TurnOpened {
        call_id: CallId,
        turn_id: TurnId,
        role: &'static str,
    },
    TurnClosed {
        call_id: CallId,
        turn_id: TurnId,
        role: &'static str,
        interrupted: bool,
    },
    TurnInterrupted {
        call_id: CallId,
        turn_id: TurnId,
    },
    ModelSelected {
        call_id: CallId,
        turn_id: TurnId,
        tier: &'static str,
        complexity: f32,
    },

    // LLM
    LLMFirstToken {
        call_id: CallId,
        turn_id: TurnId,
        latency_ms: u64,
    },
    LLMCompleted {
        call_id: CallId,
        turn_id: TurnId,
        tokens_in: usize,
        tokens_out: usize,
    },
    LLMSlowWarn {
        call_id: CallId,
        turn_id: TurnId,
    },
    LLMTimeout {
        call_id: CallId,
        turn_id: TurnId,
    },
    TurnFailed {
        call_id: CallId,
        turn_id: TurnId,
        kind: &'static str,
    },

    // TTS
    TTSFirstAudio {
        call_id: CallId,
        turn_id: TurnId,
        latency_ms: u64,
    },
    TTSCompleted {
        call_id: CallId,
        turn_id: TurnId,
    },
    SynthesisFailed {
        call_id: CallId,
        turn_id: TurnId,
        reason: String,
    },

    // Observation-only, never drives state transitions (spec §9 open question).
    DtmfReceived {
        call_id: CallId,
        digit: char,
    },

    EventDropped {
        count: u64,
    },
}

impl Event {
    /// Log level each kind should surface at when no external sink is
    /// configured, mirroring the teacher's habit of pairing structured
    /// events with `tracing` calls.
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self {
            Event::CallEnded { reason: CallEndReason::UnrecoverableFailure, .. }
            | Event::UtteranceLost { .. }
            | Event::LLMTimeout { .. }
            | Event::SynthesisFailed { .. }
            | Event::TurnFailed { .. } => Level::WARN,
            Event::StageRestarted { .. } | Event::LLMSlowWarn { .. } | Event::EventDropped { .. } => {
                Level::WARN
            }
            _ => Level::INFO,
        }
    }
}
