//! Duplex framed telephony transport contract (spec §4.2).
//!
//! The socket itself (an axum WebSocket, in the server binary) is abstracted
//! behind [`RawDuplex`] so this crate's framing, sequencing, retry, and
//! timeout logic can be exercised without an HTTP server in the loop.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;

use voicecore_core::audio::{AudioFrame, Direction};

use crate::error::TransportError;
use crate::wire::{InboundMessage, OutboundMessage, StartMetadata};

pub const READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const WRITE_RETRY_WINDOW: Duration = Duration::from_millis(100);
pub const MAX_WRITE_RETRIES: u32 = 2;

/// What a caller of `receive_frame` gets back.
#[derive(Debug, Clone)]
pub enum FrameEvent {
    Frame(AudioFrame),
    Dtmf { digit: char, timestamp_ms: u64 },
    StartInfo(StartMetadata),
    EndOfStream,
}

/// Raw duplex byte-message transport the telephony framing sits on top of.
/// A real implementation wraps an axum `WebSocket`; tests use an in-memory
/// channel pair.
#[async_trait]
pub trait RawDuplex: Send {
    async fn recv_text(&mut self) -> Option<String>;
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;
}

/// In-memory `RawDuplex` over mpsc channels, used by tests and by any
/// in-process bridge that prefers channels to a literal socket.
pub struct ChannelDuplex {
    pub rx: mpsc::Receiver<String>,
    pub tx: mpsc::Sender<String>,
    pub writable: bool,
}

#[async_trait]
impl RawDuplex for ChannelDuplex {
    async fn recv_text(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if !self.writable {
            return Err(TransportError::Write("channel closed".into()));
        }
        self.tx
            .send(text)
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }
}

/// A single call's telephony transport session (spec §4.2 contract).
pub struct TransportSession<D: RawDuplex> {
    duplex: D,
    inbound_seq: u64,
    outbound_seq: u64,
    permanently_unwritable: bool,
}

impl<D: RawDuplex> TransportSession<D> {
    pub fn new(duplex: D) -> Self {
        Self {
            duplex,
            inbound_seq: 0,
            outbound_seq: 0,
            permanently_unwritable: false,
        }
    }

    /// Produce the next inbound event. Blocks until a frame, DTMF digit,
    /// start metadata, or end-of-stream arrives; fails if more than
    /// [`READ_TIMEOUT`] elapses without any message at all (spec §4.2
    /// "Inbound read timeouts longer than 10s ... fail the call").
    pub async fn receive_frame(&mut self) -> Result<FrameEvent, TransportError> {
        let raw = timeout(READ_TIMEOUT, self.duplex.recv_text())
            .await
            .map_err(|_| TransportError::ReadTimeout(READ_TIMEOUT))?;

        let Some(text) = raw else {
            return Ok(FrameEvent::EndOfStream);
        };

        let msg = InboundMessage::parse(&text)?;
        match msg {
            InboundMessage::Connected { .. } => {
                // Handshake only; recurse for the next real event rather
                // than surfacing a synthetic frame.
                Box::pin(self.receive_frame()).await
            }
            InboundMessage::Start { metadata } => Ok(FrameEvent::StartInfo(metadata)),
            InboundMessage::Media { payload } => {
                let seq = self.inbound_seq;
                self.inbound_seq += 1;
                Ok(FrameEvent::Frame(AudioFrame::new(seq, payload, Direction::Inbound)))
            }
            InboundMessage::Dtmf { digit, timestamp_ms } => {
                Ok(FrameEvent::Dtmf { digit, timestamp_ms })
            }
            InboundMessage::Stop => Ok(FrameEvent::EndOfStream),
        }
    }

    /// Send one outbound Audio Frame. Transient write errors are retried up
    /// to [`MAX_WRITE_RETRIES`] times within [`WRITE_RETRY_WINDOW`]; a
    /// permanently unwritable socket fails the call (spec §4.2).
    pub async fn send_frame(&mut self, frame: AudioFrame) -> Result<(), TransportError> {
        if self.permanently_unwritable {
            return Err(TransportError::PermanentlyUnwritable);
        }
        let msg = OutboundMessage::Media { payload: frame.payload.to_vec() };
        self.send_with_retry(msg).await?;
        self.outbound_seq += 1;
        Ok(())
    }

    /// Flush the provider's outbound buffer — used at barge-in (spec §6.1
    /// `clear`).
    pub async fn send_clear(&mut self) -> Result<(), TransportError> {
        self.send_with_retry(OutboundMessage::Clear).await
    }

    /// Echo a pacing mark for round-trip measurement (spec §6.1 `mark`).
    pub async fn send_mark(&mut self, name: impl Into<String>) -> Result<(), TransportError> {
        self.send_with_retry(OutboundMessage::Mark { name: name.into() }).await
    }

    async fn send_with_retry(&mut self, msg: OutboundMessage) -> Result<(), TransportError> {
        let json = msg.to_json();
        let mut attempts = 0;
        let deadline = tokio::time::Instant::now() + WRITE_RETRY_WINDOW;
        loop {
            match self.duplex.send_text(json.clone()).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    attempts += 1;
                    if attempts > MAX_WRITE_RETRIES || tokio::time::Instant::now() >= deadline {
                        self.permanently_unwritable = true;
                        return Err(err);
                    }
                    tracing::warn!(attempts, "transient telephony write error, retrying");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    fn channel_pair() -> (mpsc::Sender<String>, ChannelDuplex, mpsc::Receiver<String>) {
        let (client_tx, server_rx) = mpsc::channel(16);
        let (server_tx, client_rx) = mpsc::channel(16);
        (
            client_tx,
            ChannelDuplex { rx: server_rx, tx: server_tx, writable: true },
            client_rx,
        )
    }

    #[tokio::test]
    async fn receive_frame_decodes_media() {
        let (client_tx, duplex, _client_rx) = channel_pair();
        let mut session = TransportSession::new(duplex);
        let media_json = serde_json::json!({
            "event": "media",
            "media": { "payload": BASE64.encode([0xFFu8; 160]) }
        })
        .to_string();
        client_tx.send(media_json).await.unwrap();
        match session.receive_frame().await.unwrap() {
            FrameEvent::Frame(frame) => assert_eq!(frame.sequence, 0),
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_frame_fails_permanently_on_closed_channel() {
        let (_client_tx, mut duplex, client_rx) = channel_pair();
        duplex.writable = false;
        drop(client_rx);
        let mut session = TransportSession::new(duplex);
        let frame = AudioFrame::new(0, vec![0xFF; 160], Direction::Outbound);
        let result = session.send_frame(frame).await;
        assert!(result.is_err());
        let frame2 = AudioFrame::new(1, vec![0xFF; 160], Direction::Outbound);
        assert!(matches!(
            session.send_frame(frame2).await,
            Err(TransportError::PermanentlyUnwritable)
        ));
    }

    #[tokio::test]
    async fn sequence_numbers_increase_monotonically() {
        let (client_tx, duplex, _client_rx) = channel_pair();
        let mut session = TransportSession::new(duplex);
        for _ in 0..3 {
            let media_json = serde_json::json!({
                "event": "media",
                "media": { "payload": BASE64.encode([0xFFu8; 160]) }
            })
            .to_string();
            client_tx.send(media_json).await.unwrap();
        }
        let mut seqs = Vec::new();
        for _ in 0..3 {
            if let FrameEvent::Frame(f) = session.receive_frame().await.unwrap() {
                seqs.push(f.sequence);
            }
        }
        assert_eq!(seqs, vec![0, 1, 2]);
    }
}
