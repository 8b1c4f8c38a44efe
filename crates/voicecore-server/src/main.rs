use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use voicecore_config::Settings;
use voicecore_events::{EventBus, NdjsonSink};
use voicecore_server::{create_router, init_metrics, AppState};
use voicecore_session::CallSupervisor;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).json().init();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let metrics_handle = init_metrics();

    let event_sink = Arc::new(NdjsonSink::new(|line: String| tracing::info!(target: "events", "{line}")));
    let bus = EventBus::spawn(event_sink, settings.event_sink.queue_depth);

    let bind_addr = settings.server.bind_addr.clone();
    let supervisor = CallSupervisor::new(settings.clone(), bus);
    let state = AppState { supervisor, settings: Arc::new(settings), metrics_handle };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {bind_addr}: {err}"));
    tracing::info!(addr = %bind_addr, "voicecore server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c");
    tracing::info!("shutdown signal received");
}
