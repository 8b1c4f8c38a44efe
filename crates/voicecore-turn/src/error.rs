use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TurnError {
    #[error("invalid transition: {event} while in {state}")]
    InvalidTransition { state: &'static str, event: &'static str },
    #[error("llm dispatch failed: {0}")]
    LlmFailed(String),
    #[error("tts synthesis failed: {0}")]
    TtsFailed(String),
}
