//! The conversation-turn state machine (spec §4.5). Transitions are driven
//! by `TurnEvent`s observed from STT, the LLM Dispatcher, and the TTS Client;
//! the machine itself never calls out to any of them — it only reports which
//! action the caller (`TurnController`) should take next.

use std::time::{Duration, Instant};

use voicecore_core::ids::UtteranceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Greeting,
    Listening,
    UserSpeaking,
    /// VAD has declared the utterance over but STT's final transcript
    /// hasn't arrived yet; holds here until `UtteranceFinal` or the
    /// `UtteranceLost` grace window elapses (spec §4.5, §7).
    AwaitingFinal,
    Thinking,
    AgentSpeaking,
    Ended,
}

impl TurnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::Greeting => "greeting",
            TurnState::Listening => "listening",
            TurnState::UserSpeaking => "user_speaking",
            TurnState::AwaitingFinal => "awaiting_final",
            TurnState::Thinking => "thinking",
            TurnState::AgentSpeaking => "agent_speaking",
            TurnState::Ended => "ended",
        }
    }
}

#[derive(Debug, Clone)]
pub enum TurnEvent {
    GreetingComplete,
    VoiceActivityStarted { voiced_ms: u32 },
    VoiceActivityEnded,
    /// An interim transcript for the utterance currently in flight. Never
    /// drives a transition by itself; the controller tracks the
    /// highest-confidence one seen so far as an `UtteranceLost` fallback.
    TranscriptInterim { utterance_id: UtteranceId, text: String, confidence: f32 },
    UtteranceFinal { text: String },
    /// No final transcript arrived within the grace window after
    /// `VoiceActivityEnded`. Carries the best interim seen, if any.
    UtteranceLost { fallback_text: Option<String> },
    SilenceTimeout,
    LlmFirstToken,
    LlmFailed,
    TtsComplete,
    EndCall,
    DeadlineExpired,
}

/// Minimum continuous voiced duration for a `VoiceActivityStarted` observed
/// during `AgentSpeaking` to count as a genuine barge-in rather than line
/// spillover (spec §4.5 barge-in semantics).
pub const BARGE_IN_MIN_VOICED_MS: u32 = 100;

/// Grace period after `VoiceActivityEnded` to wait for STT's final
/// transcript before declaring the utterance lost (spec §7).
pub const UTTERANCE_LOST_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    EmitGreetingDone,
    DispatchLlm,
    EmitUserSilent,
    BeginStreamingToTts,
    SpeakFallback,
    CloseAgentTurn,
    CancelAndBargeIn,
    Teardown,
}

/// Pure transition function: `(state, event) -> (next_state, action)`. No
/// side effects, no I/O — easy to exhaustively unit test against the
/// transition table in isolation from the async plumbing around it.
pub fn transition(state: TurnState, event: &TurnEvent) -> Option<(TurnState, Action)> {
    use TurnEvent::*;
    use TurnState::*;

    match (state, event) {
        (Greeting, GreetingComplete) => Some((Listening, Action::EmitGreetingDone)),
        (Listening, VoiceActivityStarted { .. }) => Some((UserSpeaking, Action::None)),
        // The ordinary case: VAD declares the utterance over well before
        // STT's final transcript lands, so dispatch waits in AwaitingFinal
        // rather than firing on an empty utterance.
        (UserSpeaking, VoiceActivityEnded) => Some((AwaitingFinal, Action::None)),
        // STT occasionally finalizes before our own VAD hysteresis confirms
        // the end of speech; dispatch immediately rather than waiting on an
        // end-of-speech signal that's already moot.
        (UserSpeaking, UtteranceFinal { .. }) => Some((Thinking, Action::DispatchLlm)),
        (AwaitingFinal, UtteranceFinal { .. }) => Some((Thinking, Action::DispatchLlm)),
        (AwaitingFinal, UtteranceLost { fallback_text: Some(_) }) => Some((Thinking, Action::DispatchLlm)),
        (AwaitingFinal, UtteranceLost { fallback_text: None }) => Some((Listening, Action::None)),
        (UserSpeaking, SilenceTimeout) => Some((Listening, Action::EmitUserSilent)),
        (Thinking, LlmFirstToken) => Some((AgentSpeaking, Action::BeginStreamingToTts)),
        (Thinking, LlmFailed) => Some((AgentSpeaking, Action::SpeakFallback)),
        // A failure surfacing after we've already optimistically entered
        // AgentSpeaking (the common case, since streaming begins the
        // instant dispatch is issued) replaces the stream with a fallback
        // utterance rather than bouncing back through Thinking.
        (AgentSpeaking, LlmFailed) => Some((AgentSpeaking, Action::SpeakFallback)),
        (AgentSpeaking, TtsComplete) => Some((Listening, Action::CloseAgentTurn)),
        (AgentSpeaking, VoiceActivityStarted { voiced_ms }) if *voiced_ms >= BARGE_IN_MIN_VOICED_MS => {
            Some((UserSpeaking, Action::CancelAndBargeIn))
        }
        (_, EndCall) | (_, DeadlineExpired) => Some((Ended, Action::Teardown)),
        _ => None,
    }
}

/// Tracks how long voice activity has been continuously observed, so the
/// controller can distinguish a genuine barge-in from brief spillover before
/// reporting `VoiceActivityStarted` to the state machine (spec §4.5).
#[derive(Debug, Default)]
pub struct VoicedRunTracker {
    started_at: Option<Instant>,
}

impl VoicedRunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_voiced_frame(&mut self) -> u32 {
        let start = *self.started_at.get_or_insert_with(Instant::now);
        start.elapsed().as_millis().min(u32::MAX as u128) as u32
    }

    pub fn reset(&mut self) {
        self.started_at = None;
    }
}

/// Tracks the silence window since the last voiced frame during
/// `UserSpeaking`, used to fire `SilenceTimeout` (spec §4.5, default 8 s).
pub fn silence_elapsed(last_voice_activity: Instant, now: Instant) -> Duration {
    now.saturating_duration_since(last_voice_activity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_to_listening_on_complete() {
        let (next, action) = transition(TurnState::Greeting, &TurnEvent::GreetingComplete).unwrap();
        assert_eq!(next, TurnState::Listening);
        assert_eq!(action, Action::EmitGreetingDone);
    }

    #[test]
    fn user_speaking_to_thinking_on_utterance_final() {
        let (next, action) =
            transition(TurnState::UserSpeaking, &TurnEvent::UtteranceFinal { text: "hi".into() }).unwrap();
        assert_eq!(next, TurnState::Thinking);
        assert_eq!(action, Action::DispatchLlm);
    }

    #[test]
    fn voice_activity_ended_waits_for_final_instead_of_dispatching() {
        let (next, action) = transition(TurnState::UserSpeaking, &TurnEvent::VoiceActivityEnded).unwrap();
        assert_eq!(next, TurnState::AwaitingFinal);
        assert_eq!(action, Action::None);
    }

    #[test]
    fn awaiting_final_dispatches_once_the_real_transcript_arrives() {
        let (next, action) =
            transition(TurnState::AwaitingFinal, &TurnEvent::UtteranceFinal { text: "hi".into() }).unwrap();
        assert_eq!(next, TurnState::Thinking);
        assert_eq!(action, Action::DispatchLlm);
    }

    #[test]
    fn utterance_lost_with_an_interim_still_dispatches() {
        let (next, action) = transition(
            TurnState::AwaitingFinal,
            &TurnEvent::UtteranceLost { fallback_text: Some("hi".into()) },
        )
        .unwrap();
        assert_eq!(next, TurnState::Thinking);
        assert_eq!(action, Action::DispatchLlm);
    }

    #[test]
    fn utterance_lost_with_no_interim_returns_to_listening_silently() {
        let (next, action) =
            transition(TurnState::AwaitingFinal, &TurnEvent::UtteranceLost { fallback_text: None }).unwrap();
        assert_eq!(next, TurnState::Listening);
        assert_eq!(action, Action::None);
    }

    #[test]
    fn silence_timeout_returns_to_listening_with_user_silent() {
        let (next, action) = transition(TurnState::UserSpeaking, &TurnEvent::SilenceTimeout).unwrap();
        assert_eq!(next, TurnState::Listening);
        assert_eq!(action, Action::EmitUserSilent);
    }

    #[test]
    fn thinking_llm_failed_still_speaks_fallback() {
        let (next, action) = transition(TurnState::Thinking, &TurnEvent::LlmFailed).unwrap();
        assert_eq!(next, TurnState::AgentSpeaking);
        assert_eq!(action, Action::SpeakFallback);
    }

    #[test]
    fn barge_in_requires_minimum_voiced_duration() {
        let short = transition(TurnState::AgentSpeaking, &TurnEvent::VoiceActivityStarted { voiced_ms: 40 });
        assert!(short.is_none(), "spillover under the threshold must not barge in");

        let (next, action) = transition(
            TurnState::AgentSpeaking,
            &TurnEvent::VoiceActivityStarted { voiced_ms: 120 },
        )
        .unwrap();
        assert_eq!(next, TurnState::UserSpeaking);
        assert_eq!(action, Action::CancelAndBargeIn);
    }

    #[test]
    fn end_call_ends_from_any_state() {
        for state in [
            TurnState::Greeting,
            TurnState::Listening,
            TurnState::AwaitingFinal,
            TurnState::Thinking,
            TurnState::AgentSpeaking,
        ] {
            let (next, action) = transition(state, &TurnEvent::EndCall).unwrap();
            assert_eq!(next, TurnState::Ended);
            assert_eq!(action, Action::Teardown);
        }
    }

    #[test]
    fn unrecognized_event_for_state_has_no_transition() {
        assert!(transition(TurnState::Listening, &TurnEvent::LlmFirstToken).is_none());
    }
}
