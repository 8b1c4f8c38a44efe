//! Supervisor-facing errors. These wrap the shared taxonomy in
//! `voicecore_core::error` rather than duplicating its variants, mirroring
//! the teacher's habit of having each layer's error type convert into a
//! coarser one at the boundary the next layer actually needs.

use thiserror::Error;
use voicecore_core::error::AcceptFailureKind;
use voicecore_core::ids::CallId;

#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error("accept failed: {kind}")]
    AcceptFailed { kind: AcceptFailureKind },

    #[error("call {0} not found in registry")]
    NotFound(CallId),

    #[error("unrecoverable stage failure: {stage}: {cause}")]
    UnrecoverableStageFailure { stage: String, cause: String },

    #[error("hard deadline exceeded")]
    DeadlineExceeded,
}

impl From<voicecore_core::error::Error> for SessionError {
    fn from(err: voicecore_core::error::Error) -> Self {
        match err {
            voicecore_core::error::Error::AcceptFailed { kind } => SessionError::AcceptFailed { kind },
            voicecore_core::error::Error::UnrecoverableStageFailure { stage, cause } => {
                SessionError::UnrecoverableStageFailure { stage, cause }
            }
            other => SessionError::UnrecoverableStageFailure { stage: "unknown".into(), cause: other.to_string() },
        }
    }
}
