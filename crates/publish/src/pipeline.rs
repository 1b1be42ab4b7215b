//! The publication pipeline: write, verify, sync, present.

use chrono::{DateTime, Utc};
use roundtable_agent::{Artifact, RunOutcome};
use roundtable_config::PublishConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::presenter::ArtifactPresenter;
use crate::vcs::VersionControlClient;
use crate::writer::write_verified;

#[derive(Debug, Clone)]
pub struct PublishSettings {
    /// Off means runs are never published
    pub enabled: bool,
    /// Publish only runs whose final state is approved
    pub require_approval: bool,
    /// Artifact location; relative paths resolve against the working directory
    pub output_path: PathBuf,
    pub remote: String,
    pub branch: Option<String>,
    /// Stage the whole working tree instead of just the artifact
    pub stage_all: bool,
    pub commit_prefix: String,
}

impl PublishSettings {
    pub fn from_config(config: &PublishConfig) -> Self {
        Self {
            enabled: config.enabled,
            require_approval: config.require_approval,
            output_path: config.output_path.clone(),
            remote: config.remote.clone(),
            branch: config.branch.clone(),
            stage_all: config.stage_all,
            commit_prefix: config.commit_prefix.clone(),
        }
    }
}

/// What a publication did. Problems are warnings, never errors.
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    pub path: PathBuf,
    /// Bytes written and verified, when the write succeeded
    pub bytes_written: Option<usize>,
    pub changed: bool,
    pub committed: bool,
    pub pushed: bool,
    pub presented: bool,
    pub commit_message: Option<String>,
    pub warnings: Vec<String>,
}

impl PublishReport {
    pub fn written(&self) -> bool {
        self.bytes_written.is_some()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// What became of a finished run's artifact.
#[derive(Debug)]
pub enum Publication {
    /// The run produced nothing to publish
    NoArtifact,
    /// Publishing is switched off
    Disabled,
    /// An artifact exists but the run was not approved
    AwaitingApproval,
    Published(PublishReport),
}

/// Publishes artifacts into one working directory.
pub struct PublicationPipeline {
    workdir: PathBuf,
    settings: PublishSettings,
    vcs: Arc<dyn VersionControlClient>,
    presenter: Option<Arc<dyn ArtifactPresenter>>,
}

impl PublicationPipeline {
    pub fn new(
        workdir: impl Into<PathBuf>,
        settings: PublishSettings,
        vcs: Arc<dyn VersionControlClient>,
    ) -> Self {
        Self {
            workdir: workdir.into(),
            settings,
            vcs,
            presenter: None,
        }
    }

    pub fn with_presenter(mut self, presenter: Arc<dyn ArtifactPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Absolute location of the artifact file.
    pub fn output_path(&self) -> PathBuf {
        if self.settings.output_path.is_absolute() {
            self.settings.output_path.clone()
        } else {
            self.workdir.join(&self.settings.output_path)
        }
    }

    /// Publish a run's artifact if it has one and the settings allow it.
    ///
    /// Nothing is written unless the result is [`Publication::Published`].
    pub async fn publish_outcome(&self, outcome: &RunOutcome) -> Publication {
        let Some(artifact) = &outcome.artifact else {
            info!("No artifact produced, nothing to publish");
            return Publication::NoArtifact;
        };
        if !self.settings.enabled {
            info!("Publishing disabled, leaving the artifact unwritten");
            return Publication::Disabled;
        }
        if self.settings.require_approval && !outcome.approved {
            info!("Run not approved, leaving the artifact unwritten");
            return Publication::AwaitingApproval;
        }
        Publication::Published(self.publish(artifact).await)
    }

    pub async fn publish(&self, artifact: &Artifact) -> PublishReport {
        self.publish_at(artifact, Utc::now()).await
    }

    /// Publish with an explicit timestamp for the commit message.
    pub async fn publish_at(&self, artifact: &Artifact, now: DateTime<Utc>) -> PublishReport {
        let path = self.output_path();
        let mut report = PublishReport {
            path: path.clone(),
            ..PublishReport::default()
        };

        if !artifact.valid {
            warn!(chars = artifact.chars(), "Refusing to publish an artifact below the length threshold");
            report
                .warnings
                .push(format!("artifact of {} chars is not valid", artifact.chars()));
            return report;
        }

        match write_verified(&path, &artifact.text).await {
            Ok(bytes) => {
                info!(path = %path.display(), bytes, "Artifact written");
                report.bytes_written = Some(bytes);
            }
            Err(e) => {
                warn!(error = %e, "Artifact write failed, skipping sync");
                report.warnings.push(e.to_string());
                return report;
            }
        }

        let message = commit_message(&self.settings.commit_prefix, &path, now);
        let stage_paths = if self.settings.stage_all {
            Vec::new()
        } else {
            vec![path.clone()]
        };
        let sync = self
            .vcs
            .stage_commit_push(
                &stage_paths,
                &message,
                &self.settings.remote,
                self.settings.branch.as_deref(),
            )
            .await;

        report.changed = sync.changed;
        report.committed = sync.committed;
        report.pushed = sync.pushed;
        if sync.committed {
            report.commit_message = Some(message);
        }
        if let Some(e) = sync.failure {
            warn!(
                error = %e,
                committed = sync.committed,
                "Synchronization incomplete"
            );
            report.warnings.push(e.to_string());
        } else if sync.pushed {
            info!(remote = %self.settings.remote, "Artifact committed and pushed");
        }

        if let Some(presenter) = &self.presenter {
            match presenter.open(&path) {
                Ok(()) => report.presented = true,
                Err(e) => warn!(error = %e, "Could not open viewer"),
            }
        }

        report
    }
}

/// `"{prefix} {file} ({UTC timestamp})"`.
fn commit_message(prefix: &str, path: &Path, now: DateTime<Utc>) -> String {
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    format!("{} {file} ({})", prefix.trim(), now.format("%Y-%m-%d %H:%M:%S UTC"))
}
