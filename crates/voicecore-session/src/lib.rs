//! The Call Supervisor: accepts calls, wires each one's stage-worker tree
//! (Telephony Transport, Audio Ingress/Egress, STT, Turn Controller), and
//! supervises restart-bounded stage failure (spec §3, §4.1).

mod error;
mod registry;
mod stages;
mod supervisor;

pub use error::SessionError;
pub use registry::{CallHandle, CallRegistry, CallStatus};
pub use supervisor::CallSupervisor;
