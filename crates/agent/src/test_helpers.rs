//! Shared test helpers for agent and orchestrator tests.

use roundtable_core::error::ProviderError;
use roundtable_core::persona::Persona;
use roundtable_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::{Arc, Mutex};

use crate::role_agent::RoleAgent;

/// A mock provider that returns a sequence of scripted replies.
///
/// Each call to `complete` returns the next entry in the script and records
/// the request it was given. Once the script runs out every call fails.
pub struct SequentialMockProvider {
    script: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    stall_when_exhausted: bool,
}

impl SequentialMockProvider {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
            stall_when_exhausted: false,
        }
    }

    /// Never answer once the script runs out (simulates a hung backend).
    pub fn stalling(mut self) -> Self {
        self.stall_when_exhausted = true;
        self
    }

    /// A provider that answers every call successfully with the given texts.
    pub fn replies(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len() - 1
        };

        let next = {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                None
            } else {
                Some(script.remove(0))
            }
        };

        match next {
            Some(Ok(text)) => Ok(make_text_response(&text, &request.model)),
            Some(Err(e)) => Err(e),
            None if self.stall_when_exhausted => std::future::pending().await,
            None => Err(ProviderError::ApiError {
                status_code: 500,
                message: format!("SequentialMockProvider: script exhausted at call #{call}"),
            }),
        }
    }
}

/// A plain text response.
pub fn make_text_response(text: &str, model: &str) -> ProviderResponse {
    ProviderResponse {
        content: text.to_string(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: model.to_string(),
    }
}

/// A role agent named `name` backed by `provider`.
pub fn agent(name: &str, provider: Arc<dyn Provider>) -> RoleAgent {
    let persona = Persona::new(name, format!("{name} role"), format!("You are the {name}."));
    RoleAgent::new(Arc::new(persona), provider, "mock-model")
}

/// A complete HTML document exactly `chars` characters long.
pub fn html_document(chars: usize) -> String {
    let head = "<!DOCTYPE html>\n<html>\n<head><title>Todo</title></head>\n<body>\n<p>";
    let tail = "</p>\n</body>\n</html>";
    let fixed = head.chars().count() + tail.chars().count();
    assert!(chars >= fixed, "html_document needs at least {fixed} chars");
    format!("{head}{}{tail}", "x".repeat(chars - fixed))
}

/// `doc` inside a labeled fenced block with some surrounding prose.
pub fn fenced_reply(doc: &str) -> String {
    format!("Here is the complete app:\n\n```html\n{doc}\n```\n\nREADY FOR USER APPROVAL")
}
