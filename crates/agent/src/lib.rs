//! The conversation engine of roundtable.
//!
//! A run goes through three stages:
//!
//! 1. **Seed** the conversation with the requester's prompt
//! 2. **Converse**: role agents take turns until the termination policy,
//!    the turn ceiling, an artifact, a failure or an interrupt stops the loop
//! 3. **Extract** the deliverable from the conversation, falling back to one
//!    directed request when nothing usable was produced
//!
//! Publishing the artifact is left to the caller.

pub mod extract;
pub mod orchestrator;
pub mod role_agent;
pub mod selection;
pub mod termination;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use extract::{Artifact, ArtifactExtractor, ExtractionCandidate, Matcher, html_cascade};
pub use orchestrator::{
    ApprovalGate, OrchestratorError, OrchestratorSettings, RunOutcome, StaticApproval, StopReason,
    TurnOrchestrator,
};
pub use role_agent::RoleAgent;
pub use selection::{RoundRobin, SelectionStrategy};
pub use termination::{HaltRule, Termination, TerminationPolicy};
