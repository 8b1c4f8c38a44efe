//! Model tier selection via a weighted complexity score (spec §4.5).

use once_cell::sync::Lazy;
use regex::Regex;

use voicecore_config::ModelTiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Heavy,
    Mid,
    Fast,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Heavy => "heavy",
            ModelTier::Mid => "mid",
            ModelTier::Fast => "fast",
        }
    }

    pub fn model_id<'a>(&self, tiers: &'a ModelTiers) -> &'a str {
        match self {
            ModelTier::Heavy => &tiers.heavy.model_id,
            ModelTier::Mid => &tiers.mid.model_id,
            ModelTier::Fast => &tiers.fast.model_id,
        }
    }

    pub fn max_tokens(&self, tiers: &ModelTiers) -> usize {
        match self {
            ModelTier::Heavy => tiers.heavy.max_tokens,
            ModelTier::Mid => tiers.mid.max_tokens,
            ModelTier::Fast => tiers.fast.max_tokens,
        }
    }
}

static QUESTION_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(what|why|how|when|where|who|which|can|could|would|should)\b").unwrap()
});
static TECHNICAL_TERMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(api|integration|refund|warranty|policy|account|invoice|subscription|error|configuration)\b").unwrap()
});
static CAPITALIZED_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z][a-z]{2,}\b").unwrap());
static MULTI_REQUEST_JOIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\band also\b|\bas well as\b| and \w+ (also|too)\b").unwrap());

/// Factors feeding the complexity score, each already normalized to [0,1]
/// by the caller or by [`ComplexityScore::from_inputs`].
#[derive(Debug, Clone, Copy)]
pub struct ComplexityFactors {
    pub prompt_length: f32,
    pub history_length: f32,
    pub entity_count: f32,
    pub question_word_count: f32,
    pub technical_term_count: f32,
    pub multi_request_count: f32,
}

/// Weights sum to 1.0 (spec §4.5).
const W_PROMPT_LENGTH: f32 = 0.2;
const W_HISTORY_LENGTH: f32 = 0.15;
const W_ENTITY_COUNT: f32 = 0.15;
const W_QUESTION_WORDS: f32 = 0.15;
const W_TECHNICAL_TERMS: f32 = 0.2;
const W_MULTI_REQUEST: f32 = 0.15;

fn normalize(count: usize, scale: f32) -> f32 {
    (count as f32 / scale).clamp(0.0, 1.0)
}

impl ComplexityFactors {
    /// Derive normalized factors directly from the new utterance and the
    /// current conversation turn count.
    pub fn from_utterance(utterance: &str, history_turns: usize) -> Self {
        Self {
            prompt_length: normalize(utterance.chars().count(), 400.0),
            history_length: normalize(history_turns, 20.0),
            entity_count: normalize(CAPITALIZED_WORD.find_iter(utterance).count(), 5.0),
            question_word_count: normalize(QUESTION_WORDS.find_iter(utterance).count(), 4.0),
            technical_term_count: normalize(TECHNICAL_TERMS.find_iter(utterance).count(), 3.0),
            multi_request_count: normalize(MULTI_REQUEST_JOIN.find_iter(utterance).count() + 1, 3.0),
        }
    }

    pub fn score(&self) -> f32 {
        (self.prompt_length * W_PROMPT_LENGTH
            + self.history_length * W_HISTORY_LENGTH
            + self.entity_count * W_ENTITY_COUNT
            + self.question_word_count * W_QUESTION_WORDS
            + self.technical_term_count * W_TECHNICAL_TERMS
            + self.multi_request_count * W_MULTI_REQUEST)
            .clamp(0.0, 1.0)
    }
}

/// Tie-break order from spec §4.5: explicit thinking request or score ≥ 0.8
/// wins heavy; 0.5..0.8 without tool requirements is mid; everything else,
/// including an explicit ultra-low-latency requirement, is fast.
pub fn select_tier(
    score: f32,
    explicit_thinking_request: bool,
    requires_tools: bool,
    ultra_low_latency: bool,
) -> ModelTier {
    if explicit_thinking_request || score >= 0.8 {
        ModelTier::Heavy
    } else if (0.5..0.8).contains(&score) && !requires_tools && !ultra_low_latency {
        ModelTier::Mid
    } else {
        ModelTier::Fast
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_thinking_request_always_wins_heavy() {
        assert_eq!(select_tier(0.1, true, false, false), ModelTier::Heavy);
    }

    #[test]
    fn high_score_selects_heavy() {
        assert_eq!(select_tier(0.85, false, false, false), ModelTier::Heavy);
    }

    #[test]
    fn mid_score_without_tools_selects_mid() {
        assert_eq!(select_tier(0.65, false, false, false), ModelTier::Mid);
    }

    #[test]
    fn mid_score_with_tool_requirement_falls_back_to_fast() {
        assert_eq!(select_tier(0.65, false, true, false), ModelTier::Fast);
    }

    #[test]
    fn low_score_selects_fast() {
        assert_eq!(select_tier(0.2, false, false, false), ModelTier::Fast);
    }

    #[test]
    fn complex_utterance_scores_higher_than_simple_one() {
        let simple = ComplexityFactors::from_utterance("ok thanks", 0).score();
        let complex = ComplexityFactors::from_utterance(
            "Why did my API integration fail and also what is your refund policy for the subscription error?",
            15,
        )
        .score();
        assert!(complex > simple);
    }
}
