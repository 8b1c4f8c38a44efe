//! Typed structured event bus and latency metrics (spec §4.8).

pub mod bus;
pub mod event;
pub mod metrics;
pub mod sink;

pub use bus::EventBus;
pub use event::{CallEndReason, Event};
pub use sink::{EventSink, NdjsonSink, TracingSink};
