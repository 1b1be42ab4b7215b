//! Turn orchestrator — drives the role agents to a terminal conversation.
//!
//! # Run lifecycle
//!
//! ```text
//! prompt ─► seed ─► ┌──────────── loop ─────────────┐
//!                   │ termination? turn ceiling?     │
//!                   │ select speaker ─► respond      │
//!                   │ append ─► ready? ask gate      │
//!                   │ past warm-up? extract eagerly  │
//!                   └────────────────────────────────┘
//!                          │ stop
//!                          ▼
//!        full-log scan ─► directed request (once) ─► RunOutcome
//! ```
//!
//! Turns are strictly sequential: each one sees every earlier message.
//! Nothing in here fails the run once it has been seeded; agent failures,
//! exhausted selection and interrupts all fall through to extraction.

use async_trait::async_trait;
use chrono::Utc;
use roundtable_config::AppConfig;
use roundtable_core::event::{DomainEvent, EventBus};
use roundtable_core::message::ConversationState;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::extract::{Artifact, ArtifactExtractor};
use crate::role_agent::RoleAgent;
use crate::selection::{RoundRobin, SelectionStrategy};
use crate::termination::{HaltRule, Termination, TerminationPolicy};

/// Why the conversational loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    Approved,
    MessageCeiling,
    TurnCeiling,
    ArtifactFound,
    SelectionExhausted,
    AgentFailed { agent: String, error: String },
    Interrupted,
}

impl From<HaltRule> for StopReason {
    fn from(rule: HaltRule) -> Self {
        match rule {
            HaltRule::Approved => Self::Approved,
            HaltRule::MessageCeiling => Self::MessageCeiling,
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "approved by requester"),
            Self::MessageCeiling => write!(f, "message ceiling reached"),
            Self::TurnCeiling => write!(f, "turn ceiling reached"),
            Self::ArtifactFound => write!(f, "artifact found"),
            Self::SelectionExhausted => write!(f, "no further speaker"),
            Self::AgentFailed { agent, error } => write!(f, "{agent} failed: {error}"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub conversation: ConversationState,
    pub stop: StopReason,
    /// Participant turns taken, directed response included
    pub turns: usize,
    pub artifact: Option<Artifact>,
    /// Whether the final state satisfies the approval rule
    pub approved: bool,
    pub directed_request_issued: bool,
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("The seed prompt is empty")]
    EmptyPrompt,
}

/// Asks the requester for a decision once the team reports it is ready.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    /// `None` means no answer (closed input, declined to answer).
    async fn ask(&self, question: &str) -> Option<String>;
}

/// A gate with a fixed answer.
#[derive(Debug, Clone)]
pub struct StaticApproval(pub Option<String>);

#[async_trait]
impl ApprovalGate for StaticApproval {
    async fn ask(&self, _question: &str) -> Option<String> {
        self.0.clone()
    }
}

/// Loop and fallback knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Hard ceiling on participant turns
    pub max_turns: usize,
    /// Turns to let pass before eager extraction starts
    pub warmup_turns: usize,
    pub stop_on_artifact: bool,
    /// Participant phrase that triggers the approval gate
    pub ready_marker: String,
    /// Lines appended to the seed prompt
    pub workflow_instructions: Vec<String>,
    pub min_discussion_turns: usize,
    /// Persona that receives the directed request
    pub artifact_author: String,
    pub last_resort: bool,
    /// `{author}` is replaced with the persona name
    pub directed_request: String,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let conversation = &config.conversation;
        let extraction = &config.extraction;
        Self {
            max_turns: conversation.max_turns,
            warmup_turns: conversation.warmup_turns,
            stop_on_artifact: conversation.stop_on_artifact,
            ready_marker: conversation.ready_marker.clone(),
            workflow_instructions: conversation.workflow_instructions.clone(),
            min_discussion_turns: conversation.min_discussion_turns,
            artifact_author: extraction.artifact_author.clone(),
            last_resort: extraction.last_resort,
            directed_request: extraction.directed_request.clone(),
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Owns one run: the agents, the policy and the conversation they build.
pub struct TurnOrchestrator {
    agents: Vec<RoleAgent>,
    selection: Box<dyn SelectionStrategy>,
    termination: TerminationPolicy,
    extractor: ArtifactExtractor,
    settings: OrchestratorSettings,
    events: Option<Arc<EventBus>>,
    approval_gate: Option<Arc<dyn ApprovalGate>>,
}

impl TurnOrchestrator {
    pub fn new(
        agents: Vec<RoleAgent>,
        termination: TerminationPolicy,
        extractor: ArtifactExtractor,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            agents,
            selection: Box::new(RoundRobin::new()),
            termination,
            extractor,
            settings,
            events: None,
            approval_gate: None,
        }
    }

    /// Wire everything from the loaded configuration.
    pub fn from_config(agents: Vec<RoleAgent>, config: &AppConfig) -> Self {
        Self::new(
            agents,
            TerminationPolicy::new(
                config.conversation.max_messages,
                config.conversation.approval_keyword.clone(),
            ),
            ArtifactExtractor::new(config.extraction.min_artifact_chars),
            OrchestratorSettings::from_config(config),
        )
    }

    pub fn with_selection(mut self, selection: impl SelectionStrategy + 'static) -> Self {
        self.selection = Box::new(selection);
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_approval_gate(mut self, gate: Arc<dyn ApprovalGate>) -> Self {
        self.approval_gate = Some(gate);
        self
    }

    /// Run to completion with no external interrupt.
    pub async fn run(self, prompt: &str) -> Result<RunOutcome, OrchestratorError> {
        self.run_until(prompt, std::future::pending::<()>()).await
    }

    /// Run until done or until `shutdown` resolves, whichever comes first.
    pub async fn run_until<F>(
        mut self,
        prompt: &str,
        shutdown: F,
    ) -> Result<RunOutcome, OrchestratorError>
    where
        F: Future<Output = ()> + Send,
    {
        if prompt.trim().is_empty() {
            return Err(OrchestratorError::EmptyPrompt);
        }
        tokio::pin!(shutdown);

        let mut state = ConversationState::seeded(self.seed_prompt(prompt));
        let conversation_id = state.id.to_string();
        info!(
            conversation = %conversation_id,
            agents = self.agents.len(),
            max_turns = self.settings.max_turns,
            "Conversation seeded"
        );
        self.emit(DomainEvent::ConversationSeeded {
            conversation_id: conversation_id.clone(),
            prompt_chars: prompt.chars().count(),
            timestamp: Utc::now(),
        });

        let mut turns = 0usize;
        let mut artifact: Option<Artifact> = None;

        let stop = loop {
            if let Termination::Stop(rule) = self.termination.evaluate(&state) {
                break StopReason::from(rule);
            }
            if turns >= self.settings.max_turns {
                break StopReason::TurnCeiling;
            }

            let Some(index) = self.selection.next_speaker(&state, &self.agents) else {
                break StopReason::SelectionExhausted;
            };
            let Some(agent) = self.agents.get(index) else {
                warn!(index, "Selection strategy returned an unknown agent");
                break StopReason::SelectionExhausted;
            };
            let author = agent.name().to_string();

            let reply = tokio::select! {
                reply = agent.respond(&state) => Some(reply),
                _ = &mut shutdown => None,
            };
            let Some(reply) = reply else {
                warn!(agent = %author, "Interrupted while waiting for a reply");
                break StopReason::Interrupted;
            };

            let content = match reply {
                Ok(content) => content,
                Err(e) => {
                    warn!(agent = %author, error = %e, "Agent failed, ending conversation");
                    self.emit(DomainEvent::AgentFailed {
                        conversation_id: conversation_id.clone(),
                        author: author.clone(),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    break StopReason::AgentFailed {
                        agent: author,
                        error: e.to_string(),
                    };
                }
            };

            let sequence = state.push_participant(author.clone(), content.clone());
            turns += 1;
            info!(turn = turns, agent = %author, chars = content.chars().count(), "Turn completed");
            self.emit(DomainEvent::TurnCompleted {
                conversation_id: conversation_id.clone(),
                turn: turns,
                author,
                content: content.clone(),
                timestamp: Utc::now(),
            });

            if self.reports_ready(&content) && !self.termination.is_approved(&state) {
                let answer = tokio::select! {
                    answer = self.ask_gate() => Some(answer),
                    _ = &mut shutdown => None,
                };
                match answer {
                    Some(Some(answer)) => {
                        debug!(chars = answer.len(), "Requester answered the approval gate");
                        state.push_requester(answer);
                    }
                    Some(None) => {}
                    None => break StopReason::Interrupted,
                }
            }

            if self.settings.stop_on_artifact && turns > self.settings.warmup_turns {
                if let Some(found) = state
                    .get(sequence)
                    .and_then(|message| self.extractor.extract_message(message))
                {
                    artifact = Some(found);
                    break StopReason::ArtifactFound;
                }
            }
        };

        info!(reason = %stop, turns, "Conversation halted");
        self.emit(DomainEvent::ConversationHalted {
            conversation_id: conversation_id.clone(),
            reason: stop.to_string(),
            turns,
            timestamp: Utc::now(),
        });

        if artifact.is_none() {
            artifact = self.extractor.scan_conversation(&state);
        }

        let mut directed_request_issued = false;
        if artifact.is_none() && self.settings.last_resort && stop != StopReason::Interrupted {
            directed_request_issued = true;
            if let Some((found, took_turn)) = self
                .directed_request(&mut state, &conversation_id, turns, &mut shutdown)
                .await
            {
                artifact = found;
                turns += usize::from(took_turn);
            }
        }

        match &artifact {
            Some(found) => {
                info!(
                    sequence = found.source_sequence,
                    pattern = %found.pattern,
                    chars = found.chars(),
                    "Artifact extracted"
                );
                self.emit(DomainEvent::ArtifactExtracted {
                    conversation_id: conversation_id.clone(),
                    source_sequence: found.source_sequence,
                    pattern: found.pattern.clone(),
                    chars: found.chars(),
                    timestamp: Utc::now(),
                });
            }
            None => {
                warn!("No artifact found in the conversation");
                self.emit(DomainEvent::ArtifactMissing {
                    conversation_id,
                    timestamp: Utc::now(),
                });
            }
        }

        let approved = self.termination.is_approved(&state);
        Ok(RunOutcome {
            conversation: state,
            stop,
            turns,
            artifact,
            approved,
            directed_request_issued,
        })
    }

    /// One directed request to the artifact author; only its reply is scanned.
    ///
    /// Returns `None` when the author is not in the cast, otherwise the
    /// extraction result and whether a turn was recorded.
    async fn directed_request<F>(
        &self,
        state: &mut ConversationState,
        conversation_id: &str,
        turns: usize,
        shutdown: &mut std::pin::Pin<&mut F>,
    ) -> Option<(Option<Artifact>, bool)>
    where
        F: Future<Output = ()> + Send,
    {
        let Some(agent) = self
            .agents
            .iter()
            .find(|a| a.name() == self.settings.artifact_author)
        else {
            warn!(
                author = %self.settings.artifact_author,
                "Artifact author is not a participant, skipping directed request"
            );
            return None;
        };

        let request = self
            .settings
            .directed_request
            .replace("{author}", agent.name());
        state.push_requester(request);
        info!(agent = %agent.name(), "Issuing directed request for the artifact");
        self.emit(DomainEvent::DirectedRequestIssued {
            conversation_id: conversation_id.to_string(),
            author: agent.name().to_string(),
            timestamp: Utc::now(),
        });

        let reply = tokio::select! {
            reply = agent.respond(state) => reply,
            _ = shutdown.as_mut() => {
                warn!("Interrupted during the directed request");
                return Some((None, false));
            }
        };

        match reply {
            Ok(content) => {
                let sequence = state.push_participant(agent.name(), content.clone());
                self.emit(DomainEvent::TurnCompleted {
                    conversation_id: conversation_id.to_string(),
                    turn: turns + 1,
                    author: agent.name().to_string(),
                    content,
                    timestamp: Utc::now(),
                });
                let found = state
                    .get(sequence)
                    .and_then(|message| self.extractor.extract_message(message));
                Some((found, true))
            }
            Err(e) => {
                warn!(agent = %agent.name(), error = %e, "Directed request failed");
                self.emit(DomainEvent::AgentFailed {
                    conversation_id: conversation_id.to_string(),
                    author: agent.name().to_string(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Some((None, false))
            }
        }
    }

    /// The prompt plus the workflow-shaping lines.
    fn seed_prompt(&self, prompt: &str) -> String {
        let mut seed = prompt.trim().to_string();
        let mut extra: Vec<String> = self.settings.workflow_instructions.clone();
        if self.settings.min_discussion_turns > 0 {
            extra.push(format!(
                "Discuss the requirements for at least {} turns before presenting the final deliverable.",
                self.settings.min_discussion_turns
            ));
        }
        if !extra.is_empty() {
            seed.push_str("\n\n");
            seed.push_str(&extra.join("\n"));
        }
        seed
    }

    fn reports_ready(&self, content: &str) -> bool {
        let marker = self.settings.ready_marker.trim();
        self.approval_gate.is_some()
            && !marker.is_empty()
            && content.to_uppercase().contains(&marker.to_uppercase())
    }

    async fn ask_gate(&self) -> Option<String> {
        let gate = self.approval_gate.as_ref()?;
        let question = format!(
            "The team reports {}. Reply {} to approve, or describe what is missing:",
            self.settings.ready_marker,
            self.termination.approval_keyword()
        );
        gate.ask(&question)
            .await
            .map(|answer| answer.trim().to_string())
            .filter(|answer| !answer.is_empty())
    }

    fn emit(&self, event: DomainEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SequentialMockProvider, agent, fenced_reply, html_document};
    use roundtable_core::error::ProviderError;
    use roundtable_core::message::Role;

    const CAST: [&str; 3] = ["BusinessAnalyst", "SoftwareEngineer", "ProductOwner"];

    fn settings() -> OrchestratorSettings {
        OrchestratorSettings {
            max_turns: 30,
            warmup_turns: 0,
            stop_on_artifact: true,
            ready_marker: "READY FOR USER APPROVAL".into(),
            workflow_instructions: Vec::new(),
            min_discussion_turns: 0,
            artifact_author: "SoftwareEngineer".into(),
            last_resort: false,
            directed_request: "{author}, please send the full HTML now.".into(),
        }
    }

    fn orchestrator(
        provider: Arc<SequentialMockProvider>,
        settings: OrchestratorSettings,
    ) -> TurnOrchestrator {
        let agents = CAST.iter().map(|name| agent(name, provider.clone())).collect();
        TurnOrchestrator::new(
            agents,
            TerminationPolicy::new(100, "APPROVED"),
            ArtifactExtractor::new(200),
            settings,
        )
    }

    #[tokio::test]
    async fn plain_discussion_yields_no_artifact() {
        let provider = Arc::new(SequentialMockProvider::replies(&[
            "We need add, remove and complete.",
            "I will keep todos in local storage.",
            "Agreed, keep it simple.",
        ]));
        let outcome = orchestrator(provider.clone(), OrchestratorSettings { max_turns: 3, ..settings() })
            .run("build a todo list app")
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::TurnCeiling);
        assert_eq!(outcome.turns, 3);
        assert!(outcome.artifact.is_none());
        assert!(!outcome.approved);
        assert!(!outcome.directed_request_issued);
        assert_eq!(provider.call_count(), 3);

        let authors: Vec<&str> = outcome
            .conversation
            .participant_messages()
            .map(|m| m.display_author())
            .collect();
        assert_eq!(authors, CAST.to_vec());
    }

    #[tokio::test]
    async fn fenced_document_stops_the_loop() {
        let doc = html_document(1200);
        let provider = Arc::new(SequentialMockProvider::replies(&[
            "Requirements: add, remove, complete.",
            &fenced_reply(&doc),
            "This should never be requested.",
        ]));
        let outcome = orchestrator(provider.clone(), settings())
            .run("build a todo list app")
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::ArtifactFound);
        assert_eq!(outcome.turns, 2);
        let artifact = outcome.artifact.unwrap();
        assert_eq!(artifact.text, doc);
        assert_eq!(artifact.source_sequence, 2);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn warm_up_defers_eager_extraction() {
        let doc = html_document(600);
        let provider = Arc::new(SequentialMockProvider::replies(&[
            &fenced_reply(&doc),
            "Looks reasonable.",
            "Let's wait for feedback.",
        ]));
        let outcome = orchestrator(
            provider,
            OrchestratorSettings {
                max_turns: 3,
                warmup_turns: 2,
                ..settings()
            },
        )
        .run("build a todo list app")
        .await
        .unwrap();

        // Not taken eagerly, recovered by the full-log scan instead.
        assert_eq!(outcome.stop, StopReason::TurnCeiling);
        assert_eq!(outcome.turns, 3);
        assert_eq!(outcome.artifact.unwrap().source_sequence, 1);
    }

    #[tokio::test]
    async fn eager_extraction_can_be_disabled() {
        let provider = Arc::new(SequentialMockProvider::replies(&[
            &fenced_reply(&html_document(600)),
            "ok",
            "ok",
        ]));
        let outcome = orchestrator(
            provider,
            OrchestratorSettings {
                max_turns: 3,
                stop_on_artifact: false,
                ..settings()
            },
        )
        .run("x")
        .await
        .unwrap();

        assert_eq!(outcome.stop, StopReason::TurnCeiling);
        assert!(outcome.artifact.is_some());
    }

    #[tokio::test]
    async fn approval_in_seed_halts_before_any_turn() {
        let provider = Arc::new(SequentialMockProvider::replies(&[]));
        let outcome = orchestrator(provider.clone(), settings())
            .run("Looks great, APPROVED")
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::Approved);
        assert_eq!(outcome.turns, 0);
        assert!(outcome.approved);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn gate_approval_halts_on_next_evaluation() {
        let provider = Arc::new(SequentialMockProvider::replies(&[
            "Requirements written.",
            "Implementation described.",
            "All requirements covered. READY FOR USER APPROVAL",
            "never requested",
        ]));
        let outcome = orchestrator(provider.clone(), settings())
            .with_approval_gate(Arc::new(StaticApproval(Some("Looks great, APPROVED".into()))))
            .run("build a todo list app")
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::Approved);
        assert_eq!(outcome.turns, 3);
        assert!(outcome.approved);
        assert_eq!(provider.call_count(), 3);
        let last = outcome.conversation.last().unwrap();
        assert_eq!(last.role, Role::Requester);
        assert_eq!(last.content, "Looks great, APPROVED");
    }

    #[tokio::test]
    async fn declined_gate_keeps_the_discussion_going() {
        let provider = Arc::new(SequentialMockProvider::replies(&[
            "READY FOR USER APPROVAL",
            "Adding due dates.",
        ]));
        let outcome = orchestrator(provider, OrchestratorSettings { max_turns: 2, ..settings() })
            .with_approval_gate(Arc::new(StaticApproval(Some("please add due dates".into()))))
            .run("x")
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::TurnCeiling);
        assert!(!outcome.approved);
        let requester_lines: Vec<&str> = outcome
            .conversation
            .messages()
            .iter()
            .filter(|m| m.is_requester())
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(requester_lines, vec!["x", "please add due dates"]);
    }

    #[tokio::test]
    async fn message_ceiling_counts_the_seed() {
        let provider = Arc::new(SequentialMockProvider::replies(&["a", "b", "c", "d"]));
        let agents = CAST.iter().map(|name| agent(name, provider.clone())).collect();
        let outcome = TurnOrchestrator::new(
            agents,
            TerminationPolicy::new(4, "APPROVED"),
            ArtifactExtractor::new(200),
            settings(),
        )
        .run("x")
        .await
        .unwrap();

        assert_eq!(outcome.stop, StopReason::MessageCeiling);
        assert_eq!(outcome.turns, 3);
        assert_eq!(outcome.conversation.len(), 4);
    }

    #[tokio::test]
    async fn agent_failure_falls_through_to_extraction() {
        let doc = html_document(500);
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(fenced_reply(&doc)),
            Err(ProviderError::Network("connection reset".into())),
        ]));
        let outcome = orchestrator(
            provider,
            OrchestratorSettings {
                warmup_turns: 5,
                ..settings()
            },
        )
        .run("x")
        .await
        .unwrap();

        assert_eq!(
            outcome.stop,
            StopReason::AgentFailed {
                agent: "SoftwareEngineer".into(),
                error: "Network error: connection reset".into(),
            }
        );
        assert_eq!(outcome.turns, 1);
        assert_eq!(outcome.artifact.unwrap().text, doc);
    }

    #[tokio::test]
    async fn exhausted_selection_is_not_an_error() {
        let provider = Arc::new(SequentialMockProvider::replies(&["a", "b", "c"]));
        let outcome = orchestrator(provider, settings())
            .with_selection(RoundRobin::rounds(1))
            .run("x")
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::SelectionExhausted);
        assert_eq!(outcome.turns, 3);
        assert!(outcome.artifact.is_none());
    }

    #[tokio::test]
    async fn last_resort_scans_only_the_directed_reply() {
        let doc = html_document(800);
        let provider = Arc::new(SequentialMockProvider::replies(&[
            "a",
            "b",
            "c",
            &fenced_reply(&doc),
        ]));
        let outcome = orchestrator(
            provider.clone(),
            OrchestratorSettings {
                max_turns: 3,
                last_resort: true,
                ..settings()
            },
        )
        .run("x")
        .await
        .unwrap();

        assert!(outcome.directed_request_issued);
        assert_eq!(outcome.turns, 4);
        assert_eq!(provider.call_count(), 4);

        let messages = outcome.conversation.messages();
        assert_eq!(messages[4].role, Role::Requester);
        assert_eq!(messages[4].content, "SoftwareEngineer, please send the full HTML now.");
        assert_eq!(messages[5].display_author(), "SoftwareEngineer");

        let artifact = outcome.artifact.unwrap();
        assert_eq!(artifact.source_sequence, 5);
        assert_eq!(artifact.text, doc);
    }

    #[tokio::test]
    async fn last_resort_is_attempted_once() {
        let provider = Arc::new(SequentialMockProvider::replies(&["a", "still no code"]));
        let outcome = orchestrator(
            provider.clone(),
            OrchestratorSettings {
                max_turns: 1,
                last_resort: true,
                ..settings()
            },
        )
        .run("x")
        .await
        .unwrap();

        assert!(outcome.directed_request_issued);
        assert!(outcome.artifact.is_none());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn interrupt_stops_without_directed_request() {
        let doc = html_document(400);
        let provider = Arc::new(
            SequentialMockProvider::replies(&[&fenced_reply(&doc)]).stalling(),
        );
        let outcome = orchestrator(
            provider.clone(),
            OrchestratorSettings {
                warmup_turns: 5,
                last_resort: true,
                ..settings()
            },
        )
        .run_until("x", tokio::time::sleep(std::time::Duration::from_millis(50)))
        .await
        .unwrap();

        assert_eq!(outcome.stop, StopReason::Interrupted);
        assert_eq!(outcome.turns, 1);
        assert!(!outcome.directed_request_issued);
        // Partial state is still scanned.
        assert_eq!(outcome.artifact.unwrap().source_sequence, 1);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected() {
        let provider = Arc::new(SequentialMockProvider::replies(&[]));
        let result = orchestrator(provider, settings()).run("   ").await;
        assert!(matches!(result, Err(OrchestratorError::EmptyPrompt)));
    }

    #[tokio::test]
    async fn seed_carries_workflow_instructions() {
        let provider = Arc::new(SequentialMockProvider::replies(&[]));
        let outcome = orchestrator(
            provider,
            OrchestratorSettings {
                max_turns: 0,
                workflow_instructions: vec!["Deliver one HTML file.".into()],
                min_discussion_turns: 6,
                ..settings()
            },
        )
        .run("build a todo list app")
        .await
        .unwrap();

        let seed = outcome.conversation.seed().unwrap();
        assert!(seed.content.starts_with("build a todo list app\n\n"));
        assert!(seed.content.contains("Deliver one HTML file."));
        assert!(seed.content.contains("at least 6 turns"));
    }

    #[tokio::test]
    async fn events_trace_the_run() {
        let bus = Arc::new(EventBus::new(64));
        let mut rx = bus.subscribe();
        let provider = Arc::new(SequentialMockProvider::replies(&[
            "Requirements.",
            &fenced_reply(&html_document(300)),
        ]));

        orchestrator(provider, settings())
            .with_event_bus(bus.clone())
            .run("x")
            .await
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event.as_ref() {
                DomainEvent::ConversationSeeded { .. } => "seeded",
                DomainEvent::TurnCompleted { .. } => "turn",
                DomainEvent::AgentFailed { .. } => "failed",
                DomainEvent::ConversationHalted { .. } => "halted",
                DomainEvent::DirectedRequestIssued { .. } => "directed",
                DomainEvent::ArtifactExtracted { .. } => "extracted",
                DomainEvent::ArtifactMissing { .. } => "missing",
            });
        }
        assert_eq!(kinds, vec!["seeded", "turn", "turn", "halted", "extracted"]);
    }

    #[test]
    fn settings_follow_config() {
        let mut config = AppConfig::default();
        config.conversation.max_turns = 12;
        config.extraction.artifact_author = "ProductOwner".into();
        let settings = OrchestratorSettings::from_config(&config);
        assert_eq!(settings.max_turns, 12);
        assert_eq!(settings.artifact_author, "ProductOwner");
        assert!(settings.last_resort);
    }
}
