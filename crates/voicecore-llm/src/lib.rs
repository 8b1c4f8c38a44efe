//! Streaming LLM dispatch, model-tier selection, and sentence extraction
//! (spec §4.5, §4.6).

mod complexity;
mod config;
mod dispatcher;
mod error;
mod sentence;
mod speculative;
mod wire;

pub use complexity::{select_tier, ComplexityFactors, ModelTier};
pub use config::{LlmEndpointConfig, FIRST_TOKEN_HARD_BUDGET, FIRST_TOKEN_SOFT_BUDGET, TTS_SENTENCE_BUDGET};
pub use dispatcher::{dispatch, DispatchOutcome};
pub use error::LlmError;
pub use sentence::{SentenceExtractor, FORCE_EMIT_LENGTH};
pub use speculative::{prepare as prepare_warm_start, qualifies as qualifies_for_warm_start, shared_client, WarmPreparation};
pub use wire::{CompletionRequest, InferenceConfig, Message, Role, StopReason, StreamEvent, ToolDefinition, Usage};
