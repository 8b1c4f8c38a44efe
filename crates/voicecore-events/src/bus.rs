//! Bounded, fire-and-forget event bus (spec §4.8).
//!
//! Publishing never blocks the caller beyond a mutex-guarded push onto a
//! ring buffer. When the buffer is full the oldest queued event is evicted
//! to make room for the new one, and an `EventDropped` counter increments —
//! the overflow policy is drop-oldest, not reject-newest, per spec.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::event::Event;
use crate::sink::EventSink;

struct Inner {
    queue: Mutex<VecDeque<Event>>,
    capacity: usize,
    dropped: AtomicU64,
    notify: Notify,
    closed: std::sync::atomic::AtomicBool,
}

pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Spawn the bus's drain task against `sink`, with a bounded capacity of
    /// `queue_depth` (spec §6.6 `event_sink.queue_depth`, default 10_000).
    pub fn spawn(sink: Arc<dyn EventSink>, queue_depth: usize) -> Self {
        let inner = Arc::new(Inner {
            queue: Mutex::new(VecDeque::with_capacity(queue_depth.min(1024))),
            capacity: queue_depth.max(1),
            dropped: AtomicU64::new(0),
            notify: Notify::new(),
            closed: std::sync::atomic::AtomicBool::new(false),
        });

        let drain_inner = inner.clone();
        tokio::spawn(async move {
            loop {
                let next = drain_inner.queue.lock().pop_front();
                match next {
                    Some(event) => sink.publish(&event).await,
                    None => {
                        if drain_inner.closed.load(Ordering::Acquire) {
                            break;
                        }
                        drain_inner.notify.notified().await;
                    }
                }
            }
        });

        Self { inner }
    }

    /// Publish an event without blocking the caller. Drops the oldest
    /// queued event on overflow, incrementing the drop counter.
    pub fn publish(&self, event: Event) {
        let mut queue = self.inner.queue.lock();
        if queue.len() >= self.inner.capacity {
            queue.pop_front();
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("voicecore_events_dropped_total").increment(1);
        }
        queue.push_back(event);
        drop(queue);
        self.inner.notify.notify_one();
    }

    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.notify.notify_one();
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NdjsonSink;
    use std::sync::Mutex as StdMutex;

    #[tokio::test]
    async fn publish_delivers_to_sink() {
        let lines = Arc::new(StdMutex::new(Vec::new()));
        let lines_clone = lines.clone();
        let sink = Arc::new(NdjsonSink::new(move |line: String| {
            lines_clone.lock().unwrap().push(line);
        }));
        let bus = EventBus::spawn(sink, 16);
        bus.publish(Event::CallStarted {
            call_id: voicecore_core::CallId::new(),
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(lines.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_counts() {
        let lines = Arc::new(StdMutex::new(Vec::new()));
        let lines_clone = lines.clone();
        let sink = Arc::new(NdjsonSink::new(move |line: String| {
            lines_clone.lock().unwrap().push(line);
        }));
        let bus = EventBus::spawn(sink, 2);
        // Fill and overflow the queue before the drain task gets a chance
        // to run by publishing synchronously without yielding.
        let ids: Vec<_> = (0..5).map(|_| voicecore_core::CallId::new()).collect();
        {
            let mut queue = bus.inner.queue.lock();
            for id in &ids {
                if queue.len() >= bus.inner.capacity {
                    queue.pop_front();
                    bus.inner.dropped.fetch_add(1, Ordering::Relaxed);
                }
                queue.push_back(Event::CallStarted { call_id: id.clone() });
            }
        }
        assert_eq!(bus.dropped_count(), 3);
    }
}
