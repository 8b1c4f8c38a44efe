//! Persistent duplex streaming speech-to-text client (spec §4.4).

mod client;
mod config;
mod error;
mod health;
mod wire;

pub use client::{run, SttEvent};
pub use config::SttConfig;
pub use error::SttError;
pub use health::{backoff_delay, classify, Health, KEEP_ALIVE_INTERVAL, MAX_RECONNECT_ATTEMPTS};
pub use wire::{HandshakePayload, ServerEvent, WireError};
