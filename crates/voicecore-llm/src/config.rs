//! Endpoint and timing configuration for the streaming completion request
//! (spec §4.6, §5 timeouts).

use std::time::Duration;

/// Soft budget: no first token by this point emits `LLMSlowWarn` but does
/// not abort the request.
pub const FIRST_TOKEN_SOFT_BUDGET: Duration = Duration::from_millis(1_500);
/// Hard budget: no first token by this point aborts with `LLMTimeout`.
pub const FIRST_TOKEN_HARD_BUDGET: Duration = Duration::from_secs(8);
/// Per-sentence synthesis budget, enforced by the TTS client, named here so
/// dispatch and synthesis share one source of truth.
pub const TTS_SENTENCE_BUDGET: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct LlmEndpointConfig {
    pub endpoint: String,
    pub credentials: String,
    pub request_timeout: Duration,
}

impl LlmEndpointConfig {
    pub fn new(endpoint: impl Into<String>, credentials: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials: credentials.into(),
            request_timeout: Duration::from_secs(30),
        }
    }
}
