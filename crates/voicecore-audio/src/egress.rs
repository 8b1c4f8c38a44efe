//! Audio Egress worker: real-time-paced outbound audio writer (spec §4.7).

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use voicecore_core::audio::{AudioFrame, CANONICAL_FRAME_MS};
use voicecore_events::{Event, EventBus};
use voicecore_core::ids::CallId;

/// Upper bound on buffered outbound audio (spec §4.7).
pub const MAX_OUTBOUND_QUEUE_MS: u32 = 500;
/// Frames kept in flight when a barge-in flushes the queue.
pub const FLUSH_KEEP_FRAMES: usize = 1;

fn max_queue_frames() -> usize {
    (MAX_OUTBOUND_QUEUE_MS / CANONICAL_FRAME_MS) as usize
}

/// Paces enqueued sentence audio out to the telephony transport at
/// wall-clock 8 kHz / 20 ms cadence, and supports barge-in flush.
pub struct AudioEgress {
    queue: VecDeque<AudioFrame>,
}

impl AudioEgress {
    pub fn new() -> Self {
        Self { queue: VecDeque::new() }
    }

    /// Enqueue synthesized frames; drops the oldest if the bound is
    /// exceeded rather than growing unbounded (observability only —
    /// the TTS client is expected to respect pacing and rarely overruns).
    pub fn enqueue(&mut self, frames: impl IntoIterator<Item = AudioFrame>) {
        for frame in frames {
            if self.queue.len() >= max_queue_frames() {
                self.queue.pop_front();
            }
            self.queue.push_back(frame);
        }
    }

    /// Flush the queue at barge-in, retaining at most `FLUSH_KEEP_FRAMES`
    /// already-enqueued frames (~20 ms, spec §4.5/§4.7).
    pub fn flush(&mut self) {
        while self.queue.len() > FLUSH_KEEP_FRAMES {
            self.queue.pop_front();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

impl Default for AudioEgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Drains `sentence_frames` at real-time cadence onto `to_transport`, honoring
/// barge-in flush requests on `flush_signal` and the parent cancellation
/// token. Runs for the lifetime of a call.
pub async fn run_egress(
    call_id: CallId,
    bus: EventBus,
    mut sentence_frames: mpsc::Receiver<AudioFrame>,
    mut flush_signal: mpsc::Receiver<()>,
    to_transport: mpsc::Sender<AudioFrame>,
    cancel: CancellationToken,
) {
    let mut egress = AudioEgress::new();
    let mut ticker = interval(Duration::from_millis(CANONICAL_FRAME_MS as u64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = flush_signal.recv() => {
                egress.flush();
            }
            maybe_frame = sentence_frames.recv() => {
                match maybe_frame {
                    Some(frame) => egress.enqueue(std::iter::once(frame)),
                    None => break,
                }
            }
            _ = ticker.tick() => {
                if let Some(frame) = egress.queue.pop_front() {
                    if to_transport.send(frame).await.is_err() {
                        break;
                    }
                } else {
                    bus.publish(Event::OutputUnderrun { call_id: call_id.clone() });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicecore_core::audio::{Direction, CANONICAL_FRAME_BYTES};

    fn frame(seq: u64) -> AudioFrame {
        AudioFrame::new(seq, vec![0xFF; CANONICAL_FRAME_BYTES], Direction::Inbound)
    }

    #[test]
    fn flush_retains_one_in_flight_frame() {
        let mut egress = AudioEgress::new();
        egress.enqueue((0..10).map(frame));
        egress.flush();
        assert_eq!(egress.len(), FLUSH_KEEP_FRAMES);
    }

    #[test]
    fn enqueue_drops_oldest_beyond_bound() {
        let mut egress = AudioEgress::new();
        let bound = max_queue_frames();
        egress.enqueue((0..bound as u64 + 5).map(frame));
        assert_eq!(egress.len(), bound);
    }
}
