use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SttError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("authentication rejected")]
    Auth,
    #[error("quota exceeded")]
    Quota,
    #[error("reconnect attempts exhausted")]
    ReconnectExhausted,
    #[error("utterance lost before a final transcript arrived")]
    UtteranceLost,
    #[error("wire error: {0}")]
    Wire(#[from] crate::wire::WireError),
}

impl SttError {
    /// Non-retryable errors terminate the session outright (spec §4.4).
    pub fn is_retriable(&self) -> bool {
        !matches!(self, SttError::Auth | SttError::Quota | SttError::ReconnectExhausted)
    }
}
