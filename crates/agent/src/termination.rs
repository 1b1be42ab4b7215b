//! Termination policy — a pure decision over the message log.

use roundtable_core::message::ConversationState;
use serde::{Deserialize, Serialize};

/// Which rule halted the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaltRule {
    /// A requester message carries the approval keyword
    Approved,
    /// The log reached the message ceiling
    MessageCeiling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Continue,
    Stop(HaltRule),
}

impl Termination {
    pub fn should_stop(&self) -> bool {
        matches!(self, Self::Stop(_))
    }
}

/// Stops on requester approval or when the log reaches `max_messages`.
#[derive(Debug, Clone)]
pub struct TerminationPolicy {
    max_messages: usize,
    approval_keyword: String,
}

impl TerminationPolicy {
    pub fn new(max_messages: usize, approval_keyword: impl Into<String>) -> Self {
        Self {
            max_messages,
            approval_keyword: approval_keyword.into().to_uppercase(),
        }
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// The keyword, uppercased.
    pub fn approval_keyword(&self) -> &str {
        &self.approval_keyword
    }

    /// Approval is checked first so an approved log reports `Approved` even
    /// when it also sits at the ceiling.
    pub fn evaluate(&self, state: &ConversationState) -> Termination {
        if self.is_approved(state) {
            Termination::Stop(HaltRule::Approved)
        } else if state.len() >= self.max_messages {
            Termination::Stop(HaltRule::MessageCeiling)
        } else {
            Termination::Continue
        }
    }

    /// True when any requester message, seed included, contains the keyword
    /// (compared uppercased).
    pub fn is_approved(&self, state: &ConversationState) -> bool {
        if self.approval_keyword.is_empty() {
            return false;
        }
        state
            .messages()
            .iter()
            .filter(|m| m.is_requester())
            .any(|m| m.content.to_uppercase().contains(&self.approval_keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_messages: usize) -> TerminationPolicy {
        TerminationPolicy::new(max_messages, "APPROVED")
    }

    #[test]
    fn fresh_conversation_continues() {
        let state = ConversationState::seeded("build a todo list app");
        assert_eq!(policy(10).evaluate(&state), Termination::Continue);
    }

    #[test]
    fn ceiling_stops_without_approval() {
        let mut state = ConversationState::seeded("build a todo list app");
        for i in 0..4 {
            state.push_participant("BusinessAnalyst", format!("turn {i}"));
        }
        assert_eq!(policy(6).evaluate(&state), Termination::Continue);
        state.push_participant("ProductOwner", "turn 5");
        assert_eq!(policy(6).evaluate(&state), Termination::Stop(HaltRule::MessageCeiling));
        state.push_participant("ProductOwner", "turn 6");
        assert!(policy(6).evaluate(&state).should_stop());
    }

    #[test]
    fn requester_approval_stops_regardless_of_count() {
        let mut state = ConversationState::seeded("build a todo list app");
        state.push_participant("ProductOwner", "READY FOR USER APPROVAL");
        state.push_requester("Looks great, APPROVED");
        assert_eq!(policy(100).evaluate(&state), Termination::Stop(HaltRule::Approved));
    }

    #[test]
    fn approval_is_case_insensitive() {
        let mut state = ConversationState::seeded("x");
        state.push_requester("approved, ship it");
        assert!(policy(100).is_approved(&state));
        assert!(TerminationPolicy::new(100, "approved").is_approved(&state));
    }

    #[test]
    fn participant_keyword_does_not_approve() {
        let mut state = ConversationState::seeded("x");
        state.push_participant("ProductOwner", "I have APPROVED the design.");
        assert!(!policy(100).is_approved(&state));
    }

    #[test]
    fn seed_prompt_counts_as_requester() {
        let state = ConversationState::seeded("Pre-APPROVED: build a clock");
        assert_eq!(policy(100).evaluate(&state), Termination::Stop(HaltRule::Approved));
    }

    #[test]
    fn approval_wins_at_the_ceiling() {
        let mut state = ConversationState::seeded("x");
        state.push_requester("APPROVED");
        assert_eq!(policy(2).evaluate(&state), Termination::Stop(HaltRule::Approved));
    }
}
