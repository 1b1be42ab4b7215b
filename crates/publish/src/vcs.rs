//! Version-control capability and its git implementation.
//!
//! Each step is a separate subprocess call. A failure stops the sequence
//! but never undoes earlier steps: a local commit stays even when the push
//! is rejected.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::error::VcsError;

/// How far a sync got.
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    pub staged: bool,
    /// The staged diff was non-empty
    pub changed: bool,
    pub committed: bool,
    pub pushed: bool,
    /// The step that stopped the sequence, if any
    pub failure: Option<VcsError>,
}

/// The operations publication needs from a version-control system.
#[async_trait]
pub trait VersionControlClient: Send + Sync {
    /// Stage the given paths.
    async fn stage(&self, paths: &[PathBuf]) -> Result<(), VcsError>;

    /// Stage every change in the working tree.
    async fn stage_all(&self) -> Result<(), VcsError>;

    /// True if `paths` (the whole index when empty) differ from HEAD in
    /// the index.
    async fn has_staged_changes(&self, paths: &[PathBuf]) -> Result<bool, VcsError>;

    /// Commit the staged state of `paths`, or the whole index when empty.
    async fn commit(&self, message: &str, paths: &[PathBuf]) -> Result<(), VcsError>;

    /// Push to `remote`; `branch` defaults to the current HEAD.
    async fn push(&self, remote: &str, branch: Option<&str>) -> Result<(), VcsError>;

    /// Stage `paths` (everything when empty), then commit and push only if
    /// their staged diff is non-empty. Other staged files stay out of the
    /// commit.
    async fn stage_commit_push(
        &self,
        paths: &[PathBuf],
        message: &str,
        remote: &str,
        branch: Option<&str>,
    ) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();

        let staged = if paths.is_empty() {
            self.stage_all().await
        } else {
            self.stage(paths).await
        };
        if let Err(e) = staged {
            outcome.failure = Some(e);
            return outcome;
        }
        outcome.staged = true;

        match self.has_staged_changes(paths).await {
            Ok(true) => outcome.changed = true,
            Ok(false) => {
                info!("Staged diff is empty, nothing to publish");
                return outcome;
            }
            Err(e) => {
                outcome.failure = Some(e);
                return outcome;
            }
        }

        if let Err(e) = self.commit(message, paths).await {
            outcome.failure = Some(e);
            return outcome;
        }
        outcome.committed = true;

        match self.push(remote, branch).await {
            Ok(()) => outcome.pushed = true,
            Err(e) => outcome.failure = Some(e),
        }
        outcome
    }
}

/// Runs `git` in a working directory that is already a repository.
#[derive(Debug, Clone)]
pub struct GitClient {
    workdir: PathBuf,
}

impl GitClient {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    async fn run_checked(&self, args: &[&str]) -> Result<Output, VcsError> {
        let output = self.run(args).await?;
        if !output.status.success() {
            let err = VcsError::CommandFailed {
                command: command_line(args),
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };
            warn!(error = %err, "git command failed");
            return Err(err);
        }
        Ok(output)
    }

    async fn run(&self, args: &[&str]) -> Result<Output, VcsError> {
        debug!(command = %command_line(args), "Running git");
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| VcsError::Spawn {
                command: command_line(args),
                reason: e.to_string(),
            })
    }
}

fn command_line(args: &[&str]) -> String {
    format!("git {}", args.join(" "))
}

/// `args` followed by `--` and `paths`, when there are any.
fn with_pathspec<'a>(args: &[&'a str], paths: &'a [String]) -> Vec<&'a str> {
    let mut all = args.to_vec();
    if !paths.is_empty() {
        all.push("--");
        all.extend(paths.iter().map(String::as_str));
    }
    all
}

fn display_paths(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

#[async_trait]
impl VersionControlClient for GitClient {
    #[instrument(skip_all, fields(paths = paths.len()))]
    async fn stage(&self, paths: &[PathBuf]) -> Result<(), VcsError> {
        let paths = display_paths(paths);
        self.run_checked(&with_pathspec(&["add"], &paths)).await?;
        Ok(())
    }

    async fn stage_all(&self) -> Result<(), VcsError> {
        self.run_checked(&["add", "-A"]).await?;
        Ok(())
    }

    async fn has_staged_changes(&self, paths: &[PathBuf]) -> Result<bool, VcsError> {
        let paths = display_paths(paths);
        let args = with_pathspec(&["diff", "--cached", "--quiet"], &paths);
        let output = self.run(&args).await?;
        // --quiet exits 1 when there are differences.
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            status => Err(VcsError::CommandFailed {
                command: command_line(&args),
                status,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
        }
    }

    #[instrument(skip_all, fields(paths = paths.len()))]
    async fn commit(&self, message: &str, paths: &[PathBuf]) -> Result<(), VcsError> {
        let paths = display_paths(paths);
        self.run_checked(&with_pathspec(&["commit", "-m", message], &paths))
            .await?;
        debug!(message, "Committed");
        Ok(())
    }

    #[instrument(skip_all, fields(remote = %remote))]
    async fn push(&self, remote: &str, branch: Option<&str>) -> Result<(), VcsError> {
        self.run_checked(&["push", remote, branch.unwrap_or("HEAD")]).await?;
        Ok(())
    }
}
