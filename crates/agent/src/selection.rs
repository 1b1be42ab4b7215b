//! Speaker selection strategies.

use roundtable_core::message::ConversationState;

use crate::role_agent::RoleAgent;

/// Decides which agent speaks next.
///
/// Returning `None` means the strategy has nothing more to offer; the
/// orchestrator then ends the loop and moves on to extraction.
pub trait SelectionStrategy: Send {
    fn next_speaker(&mut self, state: &ConversationState, agents: &[RoleAgent]) -> Option<usize>;
}

/// Cycles through the agents in configured order.
#[derive(Debug, Clone, Default)]
pub struct RoundRobin {
    next: usize,
    selected: usize,
    limit: Option<usize>,
}

impl RoundRobin {
    /// Unbounded rotation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rotation that exhausts after `rounds` full passes over the agents.
    pub fn rounds(rounds: usize) -> Self {
        Self {
            limit: Some(rounds),
            ..Self::default()
        }
    }
}

impl SelectionStrategy for RoundRobin {
    fn next_speaker(&mut self, _state: &ConversationState, agents: &[RoleAgent]) -> Option<usize> {
        if agents.is_empty() {
            return None;
        }
        let total = agents.len();
        if self
            .limit
            .is_some_and(|rounds| self.selected >= rounds.saturating_mul(total))
        {
            return None;
        }

        let index = self.next % agents.len();
        self.next = index + 1;
        self.selected += 1;
        Some(index)
    }
}
