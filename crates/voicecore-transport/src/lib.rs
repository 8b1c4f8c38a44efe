//! Telephony wire codec and duplex framed transport contract (spec §4.2, §6.1).

mod error;
mod transport;
mod wire;

pub use error::TransportError;
pub use transport::{
    ChannelDuplex, FrameEvent, RawDuplex, TransportSession, MAX_WRITE_RETRIES, READ_TIMEOUT,
    WRITE_RETRY_WINDOW,
};
pub use wire::{InboundMessage, OutboundMessage, StartMetadata, WireError};
