//! HTTP-facing error taxonomy, converting into the status codes the admin
//! and WebSocket surfaces return.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("call not found")]
    CallNotFound,

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::CallNotFound => StatusCode::NOT_FOUND,
            ServerError::WebSocket(_) => StatusCode::BAD_REQUEST,
            ServerError::Auth(_) => StatusCode::UNAUTHORIZED,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}
