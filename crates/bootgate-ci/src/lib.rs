//! bootgate CI - hardware boot tests for pull requests
//!
//! Provides the boot-test pipeline that:
//! - Skips pull requests that lack the required label
//! - Packs images and boots them on a bootery
//! - Publishes the boot log as a private gist
//! - Comments on the pull request and swaps its labels
//!
//! GitHub access and image building sit behind the `GitHubApi` and
//! `ImageBuilder` traits; the `fakes` module has in-memory versions.

pub mod config;
pub mod error;
pub mod fakes;
pub mod feedback;
pub mod gate;
pub mod github;
pub mod pipeline;
pub mod publish;
pub mod redact;
pub mod stage;
pub mod telemetry;

// Re-export key types
pub use config::{PipelineConfig, PullRequestRef};
pub use error::CiError;
pub use github::{GitHubApi, GitHubClient, GitHubConfig, LabelSet, Snippet};
pub use pipeline::{BootPipeline, PipelineOutcome};
pub use redact::Redactor;
pub use stage::{PipelineState, Stage, StageError};
pub use telemetry::init_tracing;

/// Result type for bootgate-ci operations
pub type Result<T> = std::result::Result<T, CiError>;
