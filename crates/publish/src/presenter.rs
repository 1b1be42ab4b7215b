//! Opening the published artifact locally.

use std::path::Path;
use tracing::debug;

use crate::error::PresentError;

/// Shows an artifact to the user. Failures are cosmetic.
pub trait ArtifactPresenter: Send + Sync {
    fn open(&self, path: &Path) -> Result<(), PresentError>;
}

/// Opens the file with the platform's default handler (usually a browser).
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserPresenter;

impl ArtifactPresenter for BrowserPresenter {
    fn open(&self, path: &Path) -> Result<(), PresentError> {
        debug!(path = %path.display(), "Opening artifact in viewer");
        open::that_detached(path).map_err(|e| PresentError::Launch {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
