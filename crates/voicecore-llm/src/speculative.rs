//! Speculative early-LLM warm-up (spec §4.4, §9 open question).
//!
//! Resolved to request *preparation* only: no network call is made ahead of
//! the final transcript. A qualifying interim (confidence ≥ 0.85, length ≥
//! 10 chars) pre-allocates the pieces of the completion request that don't
//! depend on the final text, so the real dispatch has less to build once the
//! utterance closes.

use crate::complexity::ModelTier;
use crate::config::LlmEndpointConfig;
use crate::wire::InferenceConfig;

/// Everything about a completion request that can be known before the final
/// transcript arrives.
#[derive(Debug, Clone)]
pub struct WarmPreparation {
    pub tier: ModelTier,
    pub model_id: String,
    pub inference_config: InferenceConfig,
}

/// Pre-allocate (never dispatch) the tier-dependent shell of the next
/// completion request for a qualifying interim transcript.
pub fn prepare(tier: ModelTier, model_id: impl Into<String>, max_tokens: usize, temperature: f32) -> WarmPreparation {
    WarmPreparation {
        tier,
        model_id: model_id.into(),
        inference_config: InferenceConfig { max_tokens, temperature },
    }
}

/// Whether an interim transcript qualifies for warm-up preparation (spec
/// §4.4): confidence ≥ 0.85 and at least 10 characters.
pub fn qualifies(confidence: f32, text: &str) -> bool {
    confidence >= 0.85 && text.chars().count() >= 10
}

/// Shared, process-wide HTTP client reused across calls — the only legitimate
/// pre-allocated resource that touches the network stack, and it never sends
/// a request on its own (spec §5 "connection pools ... managed with standard
/// pool semantics").
pub fn shared_client(config: &LlmEndpointConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .expect("reqwest client configuration is always valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifying_threshold_matches_spec() {
        assert!(qualifies(0.9, "that sounds great"));
        assert!(!qualifies(0.8, "that sounds great"));
        assert!(!qualifies(0.95, "short"));
    }

    #[test]
    fn preparation_never_touches_the_network() {
        let prep = prepare(ModelTier::Mid, "tier-mid", 512, 0.7);
        assert_eq!(prep.model_id, "tier-mid");
        assert_eq!(prep.inference_config.max_tokens, 512);
    }
}
