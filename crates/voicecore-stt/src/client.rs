//! Persistent duplex STT connection: handshake, keep-alive, health tracking,
//! and exponential-backoff reconnect (spec §4.4).

use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use voicecore_core::ids::CallId;
use voicecore_events::{Event, EventBus};

use crate::config::SttConfig;
use crate::error::SttError;
use crate::health::{backoff_delay, classify, Health, KEEP_ALIVE_INTERVAL, MAX_RECONNECT_ATTEMPTS};
use crate::wire::{HandshakePayload, ServerEvent};

/// STT-originated event surfaced to the Turn Controller.
#[derive(Debug, Clone)]
pub enum SttEvent {
    Interim { text: String, confidence: f32, start_ms: u64, duration_ms: u64 },
    Final { text: String, confidence: f32, start_ms: u64, duration_ms: u64, language: Option<String> },
    SpeechStarted,
    UtteranceEnd,
}

/// Drives the connection for the lifetime of a call, reconnecting on
/// transient failure and escalating to the caller once attempts are
/// exhausted (spec §4.4). `audio_rx` carries μ-law frames from Audio
/// Ingress; `events_tx` carries parsed STT events toward the Turn
/// Controller.
pub async fn run(
    config: SttConfig,
    call_id: CallId,
    bus: EventBus,
    mut audio_rx: mpsc::Receiver<Vec<u8>>,
    events_tx: mpsc::Sender<SttEvent>,
    cancel: CancellationToken,
) -> Result<(), SttError> {
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }
        match run_connection(&config, &call_id, &bus, attempt, &mut audio_rx, &events_tx, &cancel).await {
            Ok(()) => return Ok(()),
            Err(err) if !err.is_retriable() => return Err(err),
            Err(err) => {
                attempt += 1;
                if attempt > MAX_RECONNECT_ATTEMPTS {
                    return Err(SttError::ReconnectExhausted);
                }
                tracing::warn!(attempt, error = %err, "stt connection dropped, reconnecting");
                tokio::time::sleep(backoff_delay(attempt - 1)).await;
            }
        }
    }
}

/// Runs one connection attempt to completion (handshake through
/// disconnect/cancel). Returns `Ok(())` only on a clean, caller-requested
/// shutdown.
async fn run_connection(
    config: &SttConfig,
    call_id: &CallId,
    bus: &EventBus,
    attempt: u32,
    audio_rx: &mut mpsc::Receiver<Vec<u8>>,
    events_tx: &mpsc::Sender<SttEvent>,
    cancel: &CancellationToken,
) -> Result<(), SttError> {
    let (mut ws, _response) = connect_async(&config.endpoint)
        .await
        .map_err(|e| SttError::Connect(e.to_string()))?;

    ws.send(Message::Text(HandshakePayload::from_config(config).to_json()))
        .await
        .map_err(|e| SttError::Handshake(e.to_string()))?;

    if attempt > 0 {
        bus.publish(Event::STTReconnected { call_id: call_id.clone() });
    }

    let mut last_inbound = Instant::now();
    let mut keep_alive = interval(KEEP_ALIVE_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws.close(None).await;
                return Ok(());
            }
            _ = keep_alive.tick() => {
                ws.send(Message::Text(crate::wire::keep_alive_json()))
                    .await
                    .map_err(|e| SttError::Protocol(e.to_string()))?;
                if classify(last_inbound.elapsed()) == Health::Unhealthy {
                    return Err(SttError::Protocol("inbound silence exceeded 30s".into()));
                }
            }
            maybe_audio = audio_rx.recv() => {
                match maybe_audio {
                    Some(payload) => {
                        ws.send(Message::Binary(crate::wire::audio_message(&payload)))
                            .await
                            .map_err(|e| SttError::Protocol(e.to_string()))?;
                    }
                    None => {
                        let _ = ws.close(None).await;
                        return Ok(());
                    }
                }
            }
            maybe_msg = ws.next() => {
                let Some(msg) = maybe_msg else {
                    return Err(SttError::Protocol("connection closed by provider".into()));
                };
                let msg = msg.map_err(|e| SttError::Protocol(e.to_string()))?;
                let Message::Text(text) = msg else { continue };
                last_inbound = Instant::now();
                handle_server_event(ServerEvent::parse(&text)?, call_id, events_tx).await?;
            }
        }
    }
}

async fn handle_server_event(
    event: ServerEvent,
    call_id: &CallId,
    events_tx: &mpsc::Sender<SttEvent>,
) -> Result<(), SttError> {
    match event {
        ServerEvent::Interim { text, confidence, start_ms, duration_ms } => {
            let _ = events_tx
                .send(SttEvent::Interim { text, confidence, start_ms, duration_ms })
                .await;
        }
        ServerEvent::Final { text, confidence, start_ms, duration_ms, language } => {
            let _ = events_tx
                .send(SttEvent::Final { text, confidence, start_ms, duration_ms, language })
                .await;
        }
        ServerEvent::SpeechStarted => {
            let _ = events_tx.send(SttEvent::SpeechStarted).await;
        }
        ServerEvent::UtteranceEnd => {
            let _ = events_tx.send(SttEvent::UtteranceEnd).await;
        }
        ServerEvent::Warning { message } => {
            tracing::warn!(call_id = %call_id, message, "stt warning");
        }
        ServerEvent::Error { message, retriable } => {
            if retriable {
                return Err(SttError::Protocol(message));
            }
            return Err(if message.to_lowercase().contains("quota") {
                SttError::Quota
            } else {
                SttError::Auth
            });
        }
        ServerEvent::Metadata { request_id } => {
            tracing::debug!(call_id = %call_id, request_id, "stt metadata");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_errors_are_distinguished_from_terminal_ones() {
        assert!(SttError::Protocol("x".into()).is_retriable());
        assert!(!SttError::Auth.is_retriable());
        assert!(!SttError::Quota.is_retriable());
        assert!(!SttError::ReconnectExhausted.is_retriable());
    }

    #[tokio::test]
    async fn reconnect_gives_up_after_max_attempts() {
        let config = SttConfig::new("ws://127.0.0.1:1", "key");
        let call_id = CallId::new();
        let bus = EventBus::spawn(std::sync::Arc::new(voicecore_events::TracingSink), 4);
        let (_audio_tx, audio_rx) = mpsc::channel(4);
        let (events_tx, _events_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let result = run(config, call_id, bus, audio_rx, events_tx, cancel).await;
        assert!(matches!(result, Err(SttError::ReconnectExhausted)));
    }

    #[tokio::test]
    async fn a_retried_connection_publishes_stt_reconnected_after_handshake() {
        use std::sync::{Arc, Mutex as StdMutex};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let _ = ws.next().await; // handshake payload
            let _ = futures::future::pending::<()>().await;
        });

        let config = SttConfig::new(format!("ws://{addr}"), "key");
        let call_id = CallId::new();

        let lines = Arc::new(StdMutex::new(Vec::new()));
        let lines_clone = lines.clone();
        let sink = Arc::new(voicecore_events::NdjsonSink::new(move |line: String| {
            lines_clone.lock().unwrap().push(line);
        }));
        let bus = EventBus::spawn(sink, 4);

        let (audio_tx, mut audio_rx) = mpsc::channel(4);
        drop(audio_tx); // audio_rx.recv() returns None immediately, ending run_connection cleanly
        let (events_tx, _events_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let result = run_connection(&config, &call_id, &bus, 1, &mut audio_rx, &events_tx, &cancel).await;
        assert!(result.is_ok());

        tokio::time::sleep(Duration::from_millis(20)).await;
        let captured = lines.lock().unwrap().join("\n");
        assert!(captured.contains("stt_reconnected"), "expected STTReconnected: {captured}");
    }

    #[tokio::test]
    async fn the_first_connection_attempt_never_publishes_stt_reconnected() {
        use std::sync::{Arc, Mutex as StdMutex};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let _ = ws.next().await;
            let _ = futures::future::pending::<()>().await;
        });

        let config = SttConfig::new(format!("ws://{addr}"), "key");
        let call_id = CallId::new();

        let lines = Arc::new(StdMutex::new(Vec::new()));
        let lines_clone = lines.clone();
        let sink = Arc::new(voicecore_events::NdjsonSink::new(move |line: String| {
            lines_clone.lock().unwrap().push(line);
        }));
        let bus = EventBus::spawn(sink, 4);

        let (audio_tx, mut audio_rx) = mpsc::channel(4);
        drop(audio_tx);
        let (events_tx, _events_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let result = run_connection(&config, &call_id, &bus, 0, &mut audio_rx, &events_tx, &cancel).await;
        assert!(result.is_ok());

        tokio::time::sleep(Duration::from_millis(20)).await;
        let captured = lines.lock().unwrap().join("\n");
        assert!(!captured.contains("stt_reconnected"), "first attempt must stay silent: {captured}");
    }
}
