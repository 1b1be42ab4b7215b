//! Artifact file writer.

use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

use crate::error::PublishError;

/// Replace whatever is at `path` with `text`, then read it back.
///
/// The text is written verbatim as UTF-8. Returns the number of bytes
/// written once the re-read matches byte for byte.
pub async fn write_verified(path: &Path, text: &str) -> Result<usize, PublishError> {
    let write_error = |e: std::io::Error| PublishError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed previous artifact"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(write_error(e)),
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }

    tokio::fs::write(path, text.as_bytes())
        .await
        .map_err(write_error)?;

    let written = tokio::fs::read(path).await.map_err(write_error)?;
    if written != text.as_bytes() {
        return Err(PublishError::Verify {
            path: path.to_path_buf(),
            expected: text.len(),
            actual: written.len(),
        });
    }

    debug!(path = %path.display(), bytes = written.len(), "Artifact written and verified");
    Ok(written.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn written_bytes_match_exactly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.html");
        let text = "<!DOCTYPE html><html><body><p>Größe: 5 € ✓</p></body></html>";

        let bytes = write_verified(&path, text).await.unwrap();
        assert_eq!(bytes, text.len());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
    }

    #[tokio::test]
    async fn overwrites_previous_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, "a much longer previous artifact body").unwrap();

        write_verified(&path, "short").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "short");
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site").join("app").join("index.html");
        write_verified(&path, "<html></html>").await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn directory_in_the_way_is_a_write_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.html");
        std::fs::create_dir(&path).unwrap();

        let err = write_verified(&path, "x").await.unwrap_err();
        assert!(matches!(err, PublishError::Write { .. }));
    }
}
