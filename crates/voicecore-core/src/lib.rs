//! Shared domain types for the real-time voice interaction core.
//!
//! This crate provides foundational types used across all subsystem crates:
//! audio frames, transcript fragments, conversation turns/history, session
//! identity, and the shared error taxonomy. It intentionally carries no I/O
//! or async runtime dependency — every other crate builds on top of it.

pub mod audio;
pub mod error;
pub mod ids;
pub mod session;
pub mod transcript;
pub mod turn;

pub use audio::{AudioFrame, Direction, CANONICAL_FRAME_BYTES, CANONICAL_FRAME_MS, SAMPLE_RATE_HZ};
pub use error::{AcceptFailureKind, Error, Result};
pub use ids::{AgentProfileId, CallId, FragmentId, TenantId, TurnId, UtteranceId};
pub use session::{CallMeta, EndReason, SessionState, DEFAULT_GRACE_DRAIN, DEFAULT_HARD_DEADLINE};
pub use transcript::TranscriptFragment;
pub use turn::{estimate_tokens, ConversationHistory, ConversationTurn, PruneStrategy, TurnRole, TurnTimestamps};
