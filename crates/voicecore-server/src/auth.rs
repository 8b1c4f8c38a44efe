//! API key authentication for the admin HTTP surface. The telephony
//! WebSocket route is exempted (the provider authenticates at the network
//! layer, per spec §6.1) via `public_paths`, same as `/health`/`/metrics`.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::state::AppState;

static AUTH_DISABLED_WARNED: AtomicBool = AtomicBool::new(false);

pub async fn auth_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let auth = &state.settings.server.auth;

    if !auth.enabled {
        if !AUTH_DISABLED_WARNED.swap(true, Ordering::Relaxed) {
            tracing::warn!("admin API authentication is disabled");
        }
        return next.run(request).await;
    }

    let path = request.uri().path();
    if auth.public_paths.iter().any(|p| path.starts_with(p.as_str())) {
        return next.run(request).await;
    }

    let Some(expected) = auth.api_key.as_deref().filter(|k| !k.is_empty()) else {
        tracing::error!("admin auth is enabled but no api_key is configured");
        return (StatusCode::INTERNAL_SERVER_ERROR, "server authentication misconfigured").into_response();
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(key) if constant_time_compare(key.as_bytes(), expected.as_bytes()) => next.run(request).await,
        Some(_) => (StatusCode::UNAUTHORIZED, "invalid api key").into_response(),
        None => (StatusCode::UNAUTHORIZED, "missing authorization header").into_response(),
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_compare_matches_equal_keys() {
        assert!(constant_time_compare(b"secret", b"secret"));
        assert!(!constant_time_compare(b"secret", b"secre"));
        assert!(!constant_time_compare(b"secret", b"secreT"));
    }
}
