//! Persona — a named role configuration driving one participant.
//!
//! Instructions are opaque text loaded once at startup from a file per role
//! (e.g. `skills/BA/system_message.txt`). A missing or empty file is fatal:
//! the run never starts with a partially configured cast.

use crate::error::PersonaError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// An immutable persona shared read-only by the role agent that speaks for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// The persona's name, used as the message author (e.g. "SoftwareEngineer")
    pub name: String,

    /// One-line description of the role
    pub description: String,

    /// Opaque system instructions
    pub instructions: String,
}

impl Persona {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            instructions: instructions.into(),
        }
    }

    /// Load a persona whose instructions live in `path`.
    pub fn load(
        name: impl Into<String>,
        description: impl Into<String>,
        path: &Path,
    ) -> Result<Self, PersonaError> {
        let name = name.into();
        let instructions =
            std::fs::read_to_string(path).map_err(|e| PersonaError::ReadFailed {
                name: name.clone(),
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if instructions.trim().is_empty() {
            return Err(PersonaError::EmptyInstructions {
                name,
                path: path.to_path_buf(),
            });
        }

        debug!(persona = %name, file = %path.display(), chars = instructions.len(), "Loaded persona");

        Ok(Self {
            name,
            description: description.into(),
            instructions,
        })
    }

    /// Rough token estimate for the instructions (4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.instructions.len() / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn load_reads_instructions_verbatim() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("system_message.txt");
        fs::write(&path, "You are a meticulous business analyst.\n").unwrap();

        let persona = Persona::load("BusinessAnalyst", "Gathers requirements", &path).unwrap();
        assert_eq!(persona.name, "BusinessAnalyst");
        assert_eq!(persona.description, "Gathers requirements");
        assert_eq!(persona.instructions, "You are a meticulous business analyst.\n");
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = Persona::load("ProductOwner", "", &tmp.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, PersonaError::ReadFailed { .. }));
    }

    #[test]
    fn blank_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("blank.txt");
        fs::write(&path, "  \n\t\n").unwrap();
        let err = Persona::load("SoftwareEngineer", "", &path).unwrap_err();
        assert!(matches!(err, PersonaError::EmptyInstructions { .. }));
    }

    #[test]
    fn token_estimate() {
        let persona = Persona::new("A", "", "12345678901234567890");
        assert_eq!(persona.estimated_tokens(), 5);
    }
}
