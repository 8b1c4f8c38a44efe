//! Process entrypoint crate: the telephony WebSocket ingress and the
//! admin/metrics HTTP surface sitting on top of the Call Supervisor.

mod auth;
mod error;
mod http;
mod metrics;
mod state;
mod ws;

pub use error::ServerError;
pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;
pub use ws::AxumWebSocketDuplex;
