//! Role agent — one persona bound to the completion capability.
//!
//! Stateless apart from identity: every turn renders the full conversation
//! from this persona's point of view and asks the provider for one message.

use roundtable_core::error::ProviderError;
use roundtable_core::message::{ConversationState, Role};
use roundtable_core::persona::Persona;
use roundtable_core::provider::{ChatMessage, Provider, ProviderRequest};
use std::sync::Arc;
use tracing::debug;

/// A participant speaking for one [`Persona`].
#[derive(Clone)]
pub struct RoleAgent {
    persona: Arc<Persona>,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl RoleAgent {
    pub fn new(persona: Arc<Persona>, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            persona,
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// The persona name, used as the author of this agent's messages.
    pub fn name(&self) -> &str {
        &self.persona.name
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Render `state` as a completion request from this persona's seat.
    ///
    /// Requester messages become `user` turns, this persona's earlier
    /// messages become `assistant` turns, and everyone else's are `user`
    /// turns prefixed with `[Author]: `.
    pub fn build_request(&self, state: &ConversationState) -> ProviderRequest {
        let mut messages = Vec::with_capacity(state.len() + 1);
        messages.push(ChatMessage::system(format!(
            "{}\n\nYou are {}. The next expected speaker is {}.",
            self.persona.instructions.trim_end(),
            self.persona.name,
            self.persona.name
        )));

        for message in state.messages() {
            let chat = match message.role {
                Role::Requester => ChatMessage::user(message.content.clone()),
                Role::System => ChatMessage::system(message.content.clone()),
                Role::Participant => {
                    let author = message.display_author();
                    if author == self.persona.name {
                        ChatMessage::assistant(message.content.clone())
                    } else {
                        ChatMessage {
                            name: Some(author.to_string()),
                            ..ChatMessage::user(format!("[{author}]: {}", message.content))
                        }
                    }
                }
            };
            messages.push(chat);
        }

        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Produce this persona's next message.
    pub async fn respond(&self, state: &ConversationState) -> Result<String, ProviderError> {
        let request = self.build_request(state);
        debug!(
            agent = %self.persona.name,
            provider = self.provider.name(),
            messages = request.messages.len(),
            "Requesting completion"
        );

        let response = self.provider.complete(request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                agent = %self.persona.name,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion received"
            );
        }
        Ok(response.content)
    }
}

impl std::fmt::Debug for RoleAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleAgent")
            .field("persona", &self.persona.name)
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}
