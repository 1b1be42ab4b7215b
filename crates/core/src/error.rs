//! Error types for the roundtable domain.
//!
//! Uses `thiserror`. Each bounded context owns its error enum; callers
//! outside core wrap these in their own.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the completion capability.
///
/// `Clone` so a failure can be recorded in run outcomes and domain events.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("Failed to read instructions for persona '{name}' at {path}: {reason}")]
    ReadFailed {
        name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Instructions for persona '{name}' at {path} are empty")]
    EmptyInstructions { name: String, path: PathBuf },
}
