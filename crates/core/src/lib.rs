//! # roundtable Core
//!
//! Domain types, traits, and error definitions for the roundtable runtime.
//! This crate has **no framework dependencies** beyond serde and tokio's sync
//! primitives — it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external capability is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping the completion backend via configuration
//! - Easy testing with scripted mock implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod message;
pub mod persona;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{PersonaError, ProviderError};
pub use event::{DomainEvent, EventBus};
pub use message::{ConversationId, ConversationState, Message, Role};
pub use persona::Persona;
pub use provider::{ChatMessage, ChatRole, Provider, ProviderRequest, ProviderResponse, Usage};
