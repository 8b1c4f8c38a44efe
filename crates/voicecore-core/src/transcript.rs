//! Transcript fragments emitted by the STT client (spec §3 "Transcript Fragment").

use crate::ids::{FragmentId, UtteranceId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub fragment_id: FragmentId,
    pub utterance_id: UtteranceId,
    pub text: String,
    pub confidence: f32,
    pub is_final: bool,
    pub speech_final: bool,
    pub start_ms: u64,
    pub duration_ms: u64,
    pub language: Option<String>,
}

impl TranscriptFragment {
    pub fn confidence_clamped(&self) -> f32 {
        self.confidence.clamp(0.0, 1.0)
    }

    /// Qualifies for speculative LLM pre-allocation per spec §4.4:
    /// confidence >= 0.85 and length >= 10 characters, interim only.
    pub fn qualifies_for_speculative_warmup(&self) -> bool {
        !self.is_final && self.confidence_clamped() >= 0.85 && self.text.chars().count() >= 10
    }
}
