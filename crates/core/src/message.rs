//! Message and conversation state domain types.
//!
//! A run owns exactly one [`ConversationState`]: the requester's seed prompt,
//! followed by one participant message per turn. Messages are append-only and
//! never mutated once recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation (one per run).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human (or caller) driving the run: seed prompt, approvals, directed requests
    Requester,
    /// A role agent speaking in its persona
    Participant,
    /// Runtime notices
    System,
}

/// A single recorded message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Position in the log, assigned at append time
    pub sequence: usize,

    /// Who sent this message
    pub role: Role,

    /// Persona name for participant messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// The text content
    pub content: String,

    /// When the message was appended
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// True when this message was written by the requester.
    pub fn is_requester(&self) -> bool {
        self.role == Role::Requester
    }

    /// True when this message was produced by a role agent.
    pub fn is_participant(&self) -> bool {
        self.role == Role::Participant
    }

    /// Author name, or a role label when there is none.
    pub fn display_author(&self) -> &str {
        match (&self.author, self.role) {
            (Some(author), _) => author,
            (None, Role::Requester) => "requester",
            (None, Role::Participant) => "participant",
            (None, Role::System) => "system",
        }
    }
}

/// The ordered, append-only message log of one run.
///
/// The first message is always the requester's seed prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    /// Unique conversation ID
    pub id: ConversationId,

    /// When this conversation was seeded
    pub created_at: DateTime<Utc>,

    messages: Vec<Message>,
}

impl ConversationState {
    /// Start a conversation with the requester's seed prompt.
    pub fn seeded(prompt: impl Into<String>) -> Self {
        let mut state = Self {
            id: ConversationId::new(),
            created_at: Utc::now(),
            messages: Vec::new(),
        };
        state.append(Role::Requester, None, prompt.into());
        state
    }

    /// Append a requester message and return its sequence index.
    pub fn push_requester(&mut self, content: impl Into<String>) -> usize {
        self.append(Role::Requester, None, content.into())
    }

    /// Append a participant message authored by `author` and return its sequence index.
    pub fn push_participant(
        &mut self,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> usize {
        self.append(Role::Participant, Some(author.into()), content.into())
    }

    fn append(&mut self, role: Role, author: Option<String>, content: String) -> usize {
        let sequence = self.messages.len();
        self.messages.push(Message {
            sequence,
            role,
            author,
            content,
            timestamp: Utc::now(),
        });
        sequence
    }

    /// All recorded messages in append order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The seed prompt message.
    pub fn seed(&self) -> Option<&Message> {
        self.messages.first()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// False for any seeded state.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, sequence: usize) -> Option<&Message> {
        self.messages.get(sequence)
    }

    /// Participant messages in original order.
    pub fn participant_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_participant())
    }
}
