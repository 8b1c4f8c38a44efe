use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("authentication rejected")]
    Auth,
    #[error("quota exceeded")]
    Quota,
    #[error("no first token within the soft budget")]
    SlowFirstToken,
    #[error("no first token within the hard budget")]
    Timeout,
    #[error("malformed stream event: {0}")]
    Malformed(String),
    #[error("request cancelled")]
    Cancelled,
}

impl LlmError {
    /// Transient network/5xx errors are retried once with immediate
    /// reconnect; auth/quota errors terminate the session (spec §4.6).
    pub fn is_retriable(&self) -> bool {
        match self {
            LlmError::Network(_) => true,
            LlmError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LlmError::Auth | LlmError::Quota)
    }
}
