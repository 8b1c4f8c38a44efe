use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use voicecore_config::Settings;
use voicecore_session::CallSupervisor;

/// Shared process state handed to every axum handler. `CallSupervisor` is
/// already cheaply `Clone` (it wraps its registry and event bus in `Arc`s),
/// but `Settings` is read from several unrelated handlers (auth, the
/// telephony upgrade, admin status) so it gets its own `Arc` rather than
/// being duplicated into each.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: CallSupervisor,
    pub settings: Arc<Settings>,
    pub metrics_handle: PrometheusHandle,
}
