use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TtsError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("per-sentence synthesis timed out")]
    Timeout,
    #[error("synthesis cancelled")]
    Cancelled,
}
