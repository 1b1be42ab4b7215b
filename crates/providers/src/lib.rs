//! Chat-completion provider implementations for roundtable.
//!
//! All providers implement the `roundtable_core::Provider` trait.
//! The router builds the configured provider at startup.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
