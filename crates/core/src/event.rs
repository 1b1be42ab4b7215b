//! Domain event system — observable progress of a run.
//!
//! The orchestrator publishes an event for every turn and every decision it
//! takes. Subscribers (the CLI's live transcript, tests) react without the
//! orchestrator doing any I/O of its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The seed prompt was recorded
    ConversationSeeded {
        conversation_id: String,
        prompt_chars: usize,
        timestamp: DateTime<Utc>,
    },

    /// A participant produced a message
    TurnCompleted {
        conversation_id: String,
        turn: usize,
        author: String,
        content: String,
        timestamp: DateTime<Utc>,
    },

    /// A participant's completion call failed
    AgentFailed {
        conversation_id: String,
        author: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The conversational loop stopped
    ConversationHalted {
        conversation_id: String,
        reason: String,
        turns: usize,
        timestamp: DateTime<Utc>,
    },

    /// The last-resort request was sent to the artifact author
    DirectedRequestIssued {
        conversation_id: String,
        author: String,
        timestamp: DateTime<Utc>,
    },

    /// An artifact was selected
    ArtifactExtracted {
        conversation_id: String,
        source_sequence: usize,
        pattern: String,
        chars: usize,
        timestamp: DateTime<Utc>,
    },

    /// No artifact could be found anywhere in the conversation
    ArtifactMissing {
        conversation_id: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
