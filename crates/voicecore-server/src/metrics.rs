//! Prometheus exporter wiring. `voicecore_events::metrics` and the other
//! subsystem crates record through the `metrics` facade unconditionally;
//! this module is the one place, at process start, that installs a
//! recorder for those calls to land in and exposes it over HTTP.

use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Install the process-wide Prometheus recorder. Must run exactly once,
/// before any `metrics::counter!`/`histogram!`/`gauge!` call anywhere in
/// the process, or those calls land on the no-op default recorder.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install prometheus recorder")
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics_handle.render()
}
