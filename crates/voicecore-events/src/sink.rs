//! External event sink contract (spec §6.5): an outbound stream (log, queue,
//! or DB insert) that must accept writes without blocking the caller for
//! more than ~1 ms. The bus enforces that bound; the sink only needs to be
//! fast enough not to starve its own internal buffering.

use async_trait::async_trait;

use crate::event::Event;

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &Event);
}

/// Sink that only logs via `tracing`, used when no external sink is wired
/// up (e.g. local development).
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    async fn publish(&self, event: &Event) {
        match event.log_level() {
            tracing::Level::WARN => {
                tracing::warn!(event = ?event, "voice core event")
            }
            tracing::Level::ERROR => {
                tracing::error!(event = ?event, "voice core event")
            }
            _ => tracing::info!(event = ?event, "voice core event"),
        }
    }
}

/// Sink that serializes events as newline-delimited JSON onto any
/// `AsyncWrite`-like collaborator, matching the §6.5 NDJSON wire shape.
/// Kept generic over a send function so tests and real transports (a log
/// file, a queue client) can plug in without this crate depending on them.
pub struct NdjsonSink<F>
where
    F: Fn(String) + Send + Sync,
{
    writer: F,
}

impl<F> NdjsonSink<F>
where
    F: Fn(String) + Send + Sync,
{
    pub fn new(writer: F) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<F> EventSink for NdjsonSink<F>
where
    F: Fn(String) + Send + Sync,
{
    async fn publish(&self, event: &Event) {
        if let Ok(line) = serde_json::to_string(event) {
            (self.writer)(line);
        }
    }
}
