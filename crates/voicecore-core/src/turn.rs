//! Conversation turns and bounded history (spec §3 "Conversation Turn" /
//! "Conversation History").

use crate::ids::TurnId;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Agent,
}

/// Per-stage timestamps recorded on a turn, monotonic so latency deltas are
/// safe to compute regardless of wall-clock adjustments.
#[derive(Debug, Clone, Default)]
pub struct TurnTimestamps {
    pub user_end: Option<Instant>,
    pub llm_first_token: Option<Instant>,
    pub llm_last_token: Option<Instant>,
    pub tts_first_byte: Option<Instant>,
    pub tts_last_byte: Option<Instant>,
    pub interrupted_at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub turn_id: TurnId,
    pub role: TurnRole,
    pub text: String,
    pub timestamps: TurnTimestamps,
    pub model_id: Option<String>,
    pub tokens_in: usize,
    pub tokens_out: usize,
    pub interrupted: bool,
    closed: bool,
}

impl ConversationTurn {
    pub fn open(role: TurnRole, text: impl Into<String>) -> Self {
        Self::open_with_id(TurnId::new(), role, text)
    }

    /// Open a turn with a caller-chosen id, for callers that need to know
    /// the id before the turn's final text is known (e.g. the Turn
    /// Controller publishes `TurnOpened` before the LLM response lands).
    pub fn open_with_id(turn_id: TurnId, role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            turn_id,
            role,
            text: text.into(),
            timestamps: TurnTimestamps::default(),
            model_id: None,
            tokens_in: 0,
            tokens_out: 0,
            interrupted: false,
            closed: false,
        }
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark this turn interrupted by barge-in. Invariant (spec §3): an
    /// interrupted turn always has a populated `interrupted_at`.
    pub fn interrupt(&mut self) {
        self.interrupted = true;
        self.timestamps.interrupted_at = Some(Instant::now());
        self.closed = true;
    }
}

/// Rough language-agnostic token estimate: ~4 characters per token for
/// Latin scripts (spec §4.5), matching the teacher's `estimate_tokens`.
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() / 4).max(if text.is_empty() { 0 } else { 1 })
}

/// Bounded, ordered sequence of turns (spec §3 "Conversation History").
///
/// Bounded by both turn count (`max_turns`) and estimated token count
/// (`max_input_tokens`). When the ceiling is exceeded the oldest entries are
/// pruned before the next LLM request (spec §4.5 "Context assembly").
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
    max_turns: usize,
    max_input_tokens: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneStrategy {
    SummarizeOldest,
    RemoveRedundant,
    CompressEntityMentions,
    Truncate,
}

impl ConversationHistory {
    pub fn new(max_turns: usize, max_input_tokens: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns,
            max_input_tokens,
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
        if self.turns.len() > self.max_turns {
            let overflow = self.turns.len() - self.max_turns;
            self.turns.drain(0..overflow);
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Locate a turn by id for in-place updates (e.g. closing the agent
    /// turn once TTS finishes, or marking it interrupted on barge-in).
    pub fn turn_mut(&mut self, turn_id: &TurnId) -> Option<&mut ConversationTurn> {
        self.turns.iter_mut().find(|t| &t.turn_id == turn_id)
    }

    fn total_estimated_tokens(&self) -> usize {
        self.turns.iter().map(|t| estimate_tokens(&t.text)).sum()
    }

    /// Apply prune strategies in order (spec §4.5) until the ceiling is met
    /// or no turns remain. Returns the strategies actually applied, in
    /// order, for observability.
    ///
    /// `summarize_oldest` collapses the oldest turn's text to a short
    /// marker (a real implementation would call a summarization model;
    /// this core only prunes text length, leaving summarization itself to
    /// an external collaborator per spec §1 scope).
    pub fn prune_to_budget(&mut self) -> Vec<PruneStrategy> {
        let mut applied = Vec::new();
        if self.total_estimated_tokens() <= self.max_input_tokens {
            return applied;
        }

        applied.push(PruneStrategy::SummarizeOldest);
        for idx in 0..self.turns.len() {
            if self.total_estimated_tokens() <= self.max_input_tokens {
                break;
            }
            let turn = &mut self.turns[idx];
            if turn.text.chars().count() > 120 {
                let summary: String = turn.text.chars().take(80).collect();
                turn.text = format!("{summary}…");
            }
        }

        if self.total_estimated_tokens() > self.max_input_tokens {
            applied.push(PruneStrategy::RemoveRedundant);
            self.remove_redundant_exchanges();
        }

        if self.total_estimated_tokens() > self.max_input_tokens {
            applied.push(PruneStrategy::CompressEntityMentions);
            for turn in self.turns.iter_mut() {
                turn.text = compress_entity_mentions(&turn.text);
            }
        }

        while self.total_estimated_tokens() > self.max_input_tokens && !self.turns.is_empty() {
            applied.push(PruneStrategy::Truncate);
            self.turns.remove(0);
        }

        applied
    }

    /// Remove consecutive turns with near-identical text, oldest first —
    /// a cheap proxy for "redundant exchanges" (spec §4.5).
    fn remove_redundant_exchanges(&mut self) {
        let mut seen = std::collections::HashSet::new();
        let mut keep = Vec::with_capacity(self.turns.len());
        for turn in self.turns.drain(..) {
            let key = turn.text.trim().to_lowercase();
            if seen.insert(key) {
                keep.push(turn);
            }
        }
        self.turns = keep;
    }

    pub fn exceeds_budget(&self) -> bool {
        self.total_estimated_tokens() > self.max_input_tokens
    }
}

/// Collapse repeated whitespace-separated numeric/proper-noun-looking runs;
/// a deliberately simple proxy for "compress entity mentions" (spec §4.5) —
/// full entity resolution belongs to an external collaborator.
fn compress_entity_mentions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_by_turn_count() {
        let mut history = ConversationHistory::new(2, 100_000);
        for i in 0..5 {
            history.push(ConversationTurn::open(TurnRole::User, format!("turn {i}")));
        }
        assert_eq!(history.turn_count(), 2);
        assert_eq!(history.turns()[0].text, "turn 3");
    }

    #[test]
    fn interrupt_sets_interrupted_at() {
        let mut turn = ConversationTurn::open(TurnRole::Agent, "hello");
        turn.interrupt();
        assert!(turn.interrupted);
        assert!(turn.timestamps.interrupted_at.is_some());
        assert!(turn.is_closed());
    }

    #[test]
    fn prune_reduces_below_budget() {
        let mut history = ConversationHistory::new(50, 20);
        for i in 0..10 {
            history.push(ConversationTurn::open(
                TurnRole::User,
                format!("this is a reasonably long utterance number {i} with extra words"),
            ));
        }
        assert!(history.exceeds_budget());
        let applied = history.prune_to_budget();
        assert!(!applied.is_empty());
        assert!(!history.exceeds_budget());
    }
}
