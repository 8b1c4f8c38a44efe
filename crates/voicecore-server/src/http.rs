//! Admin/observation HTTP surface (spec §9 "rare, admin/observation; no
//! hot-path HTTP") plus the telephony WebSocket ingress route.

use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ws::{call_status_handler, end_call_handler, telephony_ws_handler};

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.settings.server.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/calls/:call_id/status", get(call_status_handler))
        .route("/calls/:call_id", delete(end_call_handler))
        .route("/telephony/ws", get(telephony_ws_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new().allow_methods([Method::GET, Method::DELETE]).allow_headers(Any);
    }
    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if parsed.is_empty() {
        tracing::warn!("all configured cors_origins were invalid, falling back to permissive");
        return CorsLayer::permissive();
    }
    CorsLayer::new().allow_origin(parsed).allow_methods([Method::GET, Method::DELETE]).allow_headers(Any)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy", "version": env!("CARGO_PKG_VERSION") }))
}

async fn readiness_check(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ready", "active_calls": state.supervisor.registry().len() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::Arc;
    use voicecore_config::Settings;
    use voicecore_events::{EventBus, TracingSink};
    use voicecore_session::CallSupervisor;

    fn test_settings() -> Settings {
        let mut settings = Settings {
            stt_api_key: "k".into(),
            llm_credentials: "k".into(),
            tts_api_key: "k".into(),
            default_voice_id: "default".into(),
            fallback_utterance_text: "sorry".into(),
            max_call_seconds: 3600,
            silence_timeout_seconds: 8,
            jitter_target_ms: 50,
            jitter_max_ms: 200,
            vad: Default::default(),
            model_tiers: Default::default(),
            history: Default::default(),
            event_sink: Default::default(),
            server: Default::default(),
            stt_endpoint: None,
            llm_endpoint: None,
            tts_endpoint: None,
        };
        settings.validate().unwrap();
        settings
    }

    #[tokio::test]
    async fn router_builds_without_panicking() {
        let bus = EventBus::spawn(Arc::new(TracingSink), 16);
        let supervisor = CallSupervisor::new(test_settings(), bus);
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let state = AppState { supervisor, settings: Arc::new(test_settings()), metrics_handle: handle };
        let _ = create_router(state);
    }
}
