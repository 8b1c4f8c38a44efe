//! Sentence-level streaming speech synthesis (spec §4.7): resolves the voice
//! for each sentence, synthesizes it against the provider with a per-sentence
//! timeout, and hands canonical outbound audio frames to Audio Egress.

mod client;
mod error;
mod queue;
mod voice;

pub use client::{synthesize, SENTENCE_SYNTHESIS_TIMEOUT};
pub use error::TtsError;
pub use queue::{run_queue, TtsEndpointConfig};
pub use voice::{resolve_voice, ResolvedVoice, VoiceConfig};
