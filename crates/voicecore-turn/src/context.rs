//! LLM context assembly (spec §4.5 "Context assembly"): system preamble +
//! pruned conversation history + the new user utterance.

use voicecore_core::turn::{ConversationHistory, ConversationTurn, PruneStrategy, TurnRole};
use voicecore_llm::{Message, Role};

/// An agent profile's fixed identity, independent of any one call.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub name: String,
    pub persona_preamble: String,
}

/// Render the system preamble from the agent profile and current turn
/// state — reflects "current conversation state and agent profile" per
/// spec §4.5.
pub fn system_preamble(profile: &AgentProfile, turn_count: usize) -> String {
    format!(
        "{preamble}\n\nYou are {name}. This is turn {turn} of the conversation.",
        preamble = profile.persona_preamble,
        name = profile.name,
        turn = turn_count + 1,
    )
}

/// Assemble the full message list for the next LLM request: pruned history
/// followed by the new user utterance. Pruning happens in place on
/// `history` so the caller's `ConversationHistory` reflects what was
/// actually sent.
pub fn assemble_messages(
    history: &mut ConversationHistory,
    new_utterance: &str,
) -> (Vec<Message>, Vec<PruneStrategy>) {
    let applied = history.prune_to_budget();

    let mut messages: Vec<Message> = history
        .turns()
        .iter()
        .map(turn_to_message)
        .collect();
    messages.push(Message { role: Role::User, content: new_utterance.to_string() });

    (messages, applied)
}

fn turn_to_message(turn: &ConversationTurn) -> Message {
    let role = match turn.role {
        TurnRole::User => Role::User,
        TurnRole::Agent => Role::Assistant,
    };
    Message { role, content: turn.text.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voicecore_core::turn::ConversationTurn;

    fn profile() -> AgentProfile {
        AgentProfile { name: "Ava".into(), persona_preamble: "Be concise and warm.".into() }
    }

    #[test]
    fn preamble_includes_profile_name_and_turn_number() {
        let rendered = system_preamble(&profile(), 3);
        assert!(rendered.contains("Ava"));
        assert!(rendered.contains("turn 4"));
    }

    #[test]
    fn assemble_appends_new_utterance_after_history() {
        let mut history = ConversationHistory::new(50, 8_000);
        history.push(ConversationTurn::open(TurnRole::User, "earlier question"));
        history.push(ConversationTurn::open(TurnRole::Agent, "earlier answer"));

        let (messages, applied) = assemble_messages(&mut history, "new question");
        assert!(applied.is_empty());
        assert_eq!(messages.len(), 3);
        assert_eq!(messages.last().unwrap().content, "new question");
        assert!(matches!(messages.last().unwrap().role, Role::User));
    }

    #[test]
    fn assemble_prunes_when_over_budget() {
        let mut history = ConversationHistory::new(50, 20);
        for i in 0..10 {
            history.push(ConversationTurn::open(
                TurnRole::User,
                format!("this is a reasonably long utterance number {i} with extra words"),
            ));
        }
        let (_messages, applied) = assemble_messages(&mut history, "new question");
        assert!(!applied.is_empty());
    }
}
