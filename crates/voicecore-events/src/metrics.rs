//! Thin wrappers around the `metrics` facade for the counters and
//! histograms named throughout spec §4.8/§8. Kept as free functions so
//! every crate can record without depending on a shared registry handle —
//! the actual exporter is installed once, at process start, by the server
//! binary (mirrors the teacher's `init_metrics`/`record_*` split between
//! `crates/server/src/metrics.rs` and its callers).

use std::time::Duration;

pub fn record_llm_first_token_latency(latency: Duration) {
    metrics::histogram!("voicecore_llm_first_token_ms").record(latency.as_millis() as f64);
}

pub fn record_tts_first_audio_latency(latency: Duration) {
    metrics::histogram!("voicecore_tts_first_audio_ms").record(latency.as_millis() as f64);
}

pub fn record_stage_restart(stage: &'static str) {
    metrics::counter!("voicecore_stage_restarts_total", "stage" => stage).increment(1);
}

pub fn record_call_ended(reason: &'static str) {
    metrics::counter!("voicecore_calls_ended_total", "reason" => reason).increment(1);
}

pub fn record_ingress_drop(frames: u64) {
    metrics::counter!("voicecore_ingress_drop_frames_total").increment(frames);
}

pub fn record_output_underrun() {
    metrics::counter!("voicecore_output_underruns_total").increment(1);
}

pub fn set_jitter_buffer_target_ms(ms: f64) {
    metrics::gauge!("voicecore_jitter_target_ms").set(ms);
}
