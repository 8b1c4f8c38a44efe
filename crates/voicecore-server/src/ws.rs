//! Bridges an axum WebSocket to [`voicecore_transport::RawDuplex`], and the
//! WebSocket upgrade handler that starts a call.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::Deserialize;

use voicecore_core::ids::{AgentProfileId, TenantId};
use voicecore_transport::{RawDuplex, TransportError};
use voicecore_turn::AgentProfile;

use crate::state::AppState;

/// Adapts axum's `WebSocket` (text/binary/ping/pong/close frames) down to
/// the plain text-message duplex `voicecore-transport`'s framing sits on.
/// Non-text frames carry nothing the wire format (spec §6.1, all-JSON) can
/// use, so they're acknowledged and dropped rather than surfaced.
pub struct AxumWebSocketDuplex {
    socket: WebSocket,
}

impl AxumWebSocketDuplex {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl RawDuplex for AxumWebSocketDuplex {
    async fn recv_text(&mut self) -> Option<String> {
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Text(text))) => return Some(text),
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "websocket read error");
                    return None;
                }
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct CallParams {
    #[serde(default)]
    tenant_id: Option<String>,
    #[serde(default)]
    agent_profile_id: Option<String>,
}

/// The single agent profile available until a profile registry exists
/// (spec §9 open question — out of scope here; see DESIGN.md).
fn default_profile() -> AgentProfile {
    AgentProfile {
        name: "Agent".to_string(),
        persona_preamble: "You are a helpful, concise voice assistant.".to_string(),
    }
}

pub async fn telephony_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<CallParams>,
) -> impl IntoResponse {
    let tenant_id = params.tenant_id.map(TenantId::from).unwrap_or_default();
    let agent_profile_id = params.agent_profile_id.map(AgentProfileId::from).unwrap_or_default();

    ws.on_upgrade(move |socket| async move {
        let duplex = AxumWebSocketDuplex::new(socket);
        let call_id = state.supervisor.accept_call(duplex, tenant_id, agent_profile_id, default_profile());
        tracing::info!(call_id = %call_id, "call accepted");
    })
}

#[derive(serde::Serialize)]
pub(crate) struct CallStatusResponse {
    call_id: String,
    tenant_id: String,
    agent_profile_id: String,
    state: String,
    elapsed_ms: u64,
}

pub async fn call_status_handler(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<axum::Json<CallStatusResponse>, axum::http::StatusCode> {
    let call_id = voicecore_core::ids::CallId::from(call_id);
    let status = state.supervisor.status(&call_id).ok_or(axum::http::StatusCode::NOT_FOUND)?;
    Ok(axum::Json(CallStatusResponse {
        call_id: status.call_id.to_string(),
        tenant_id: status.tenant_id.to_string(),
        agent_profile_id: status.agent_profile_id.to_string(),
        state: format!("{:?}", status.state),
        elapsed_ms: status.elapsed.as_millis() as u64,
    }))
}

pub async fn end_call_handler(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> axum::http::StatusCode {
    let call_id = voicecore_core::ids::CallId::from(call_id);
    match state.supervisor.end_call(&call_id, voicecore_events::CallEndReason::AgentInitiated) {
        Ok(()) => axum::http::StatusCode::ACCEPTED,
        Err(_) => axum::http::StatusCode::NOT_FOUND,
    }
}
