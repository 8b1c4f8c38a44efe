use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("socket closed")]
    Closed,
    #[error("write error: {0}")]
    Write(String),
    #[error("read timeout: no frame or keep-alive for {0:?}")]
    ReadTimeout(std::time::Duration),
    #[error("permanently unwritable socket")]
    PermanentlyUnwritable,
    #[error("wire decode error: {0}")]
    Wire(#[from] crate::wire::WireError),
}
