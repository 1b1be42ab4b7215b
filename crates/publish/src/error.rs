//! Publication error types.

use std::path::PathBuf;
use thiserror::Error;

/// A failed version-control operation, with whatever the tool printed.
#[derive(Debug, Clone, Error)]
pub enum VcsError {
    #[error("Failed to run `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("`{command}` exited with {}: {}", display_status(.status), .stderr.trim())]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

fn display_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "no status (killed by signal)".to_string(),
    }
}

#[derive(Debug, Clone, Error)]
pub enum PublishError {
    #[error("Failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Verification of {path} failed: expected {expected} bytes, read back {actual}")]
    Verify {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("Version control error: {0}")]
    Vcs(#[from] VcsError),
}

#[derive(Debug, Clone, Error)]
pub enum PresentError {
    #[error("Failed to open {path} in a viewer: {reason}")]
    Launch { path: PathBuf, reason: String },
}
