//! The conversation-turn state machine, barge-in, model-tier selection, and
//! context assembly (spec §4.5).

mod context;
mod controller;
mod error;
mod state;

pub use context::{assemble_messages, system_preamble, AgentProfile};
pub use controller::{spawn, TurnControllerConfig};
pub use error::TurnError;
pub use state::{transition, Action, TurnEvent, TurnState, VoicedRunTracker, BARGE_IN_MIN_VOICED_MS};
