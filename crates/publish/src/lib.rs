//! Publication of an extracted artifact.
//!
//! The artifact is written to a fixed path and verified. It is then synced to
//! the version-control remote only when the staged diff is non-empty, so
//! republishing identical content never creates a second commit. Every
//! failure is collected into the [`PublishReport`] instead of aborting.

pub mod error;
pub mod pipeline;
pub mod presenter;
pub mod vcs;
pub mod writer;

pub use error::{PresentError, PublishError, VcsError};
pub use pipeline::{Publication, PublicationPipeline, PublishReport, PublishSettings};
pub use presenter::{ArtifactPresenter, BrowserPresenter};
pub use vcs::{GitClient, SyncOutcome, VersionControlClient};
pub use writer::write_verified;
