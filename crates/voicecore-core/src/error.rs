//! Crate-wide error taxonomy (spec §7). Each subsystem crate defines its own
//! typed error enum and converts into this aggregator at the boundary where
//! the Call Supervisor needs to reason about it uniformly, mirroring the
//! teacher's `AgentError`/`ServerError` `From<...>` chains.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("stt connect error: {0}")]
    SttConnect(String),
    #[error("stt protocol error: {0}")]
    SttProtocol(String),
    #[error("stt auth error: {0}")]
    SttAuth(String),

    #[error("llm timeout")]
    LlmTimeout,
    #[error("llm network error: {0}")]
    LlmNetwork(String),
    #[error("llm auth error: {0}")]
    LlmAuth(String),

    #[error("tts error: {0}")]
    Tts(String),

    #[error("utterance lost: no final transcript within grace period")]
    UtteranceLost,

    #[error("conversation token budget exceeded")]
    BudgetExceeded,

    #[error("internal invariant violated: {0}")]
    InternalInvariantViolated(String),

    #[error("accept failed: {kind}")]
    AcceptFailed { kind: AcceptFailureKind },

    #[error("unrecoverable stage failure: {stage}: {cause}")]
    UnrecoverableStageFailure { stage: String, cause: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptFailureKind {
    Transport,
    Stt,
    Llm,
    Config,
}

impl std::fmt::Display for AcceptFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AcceptFailureKind::Transport => "transport",
            AcceptFailureKind::Stt => "stt",
            AcceptFailureKind::Llm => "llm",
            AcceptFailureKind::Config => "config",
        };
        write!(f, "{s}")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
