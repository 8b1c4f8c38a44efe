//! Voice Activity Detection, jitter buffering, and real-time-paced audio
//! egress for a single call's telephony audio (spec §4.3, §4.7).

mod egress;
mod ingress;
mod jitter;
mod preroll;
mod vad;

pub use egress::{run_egress, AudioEgress, FLUSH_KEEP_FRAMES, MAX_OUTBOUND_QUEUE_MS};
pub use ingress::{run_ingress, IngressOutput, VoiceActivity};
pub use jitter::{DropReport, JitterBuffer, ADAPT_STEP_MS, MAX_TARGET_MS, MIN_TARGET_MS};
pub use preroll::{PrerollBuffer, DEFAULT_PREROLL_MS};
pub use vad::{VadMode, VadTransition, VoiceActivityDetector};
