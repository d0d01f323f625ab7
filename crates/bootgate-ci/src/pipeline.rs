//! Boot-test pipeline orchestration.
//!
//! One run walks strictly forward through
//! `Start → Gated → Built → [RootUpdated] → BootTested → LogPublished →
//! Commented → Labeled → Done` and stops at the first failing stage. A pull
//! request without the required label ends the run early as `Skipped`.

use crate::config::PipelineConfig;
use crate::error::CiError;
use crate::feedback::report_success;
use crate::gate::check_required_label;
use crate::github::GitHubApi;
use crate::publish::publish_boot_log;
use crate::redact::Redactor;
use crate::stage::{AtStage, PipelineState, Stage, StageError, StateTracker};
use bootery_client::{boot_test_url, BooteryClient, ImageBuilder};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

/// Terminal result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The required label was not set; nothing was built or tested.
    Skipped { label: String },

    /// The boot test passed and the PR was updated.
    Succeeded { log_url: String },

    /// `stage` failed; `reason` has the bootery URL redacted.
    Failed { stage: Stage, reason: String },
}

impl PipelineOutcome {
    /// Process exit code. Skipping is not a CI failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineOutcome::Skipped { .. } | PipelineOutcome::Succeeded { .. } => 0,
            PipelineOutcome::Failed { .. } => 1,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PipelineOutcome::Failed { .. })
    }
}

/// Boot-test pipeline for one pull request.
pub struct BootPipeline {
    config: PipelineConfig,
    github: Arc<dyn GitHubApi>,
    builder: Arc<dyn ImageBuilder>,
    bootery: BooteryClient,
    redactor: Redactor,
}

impl BootPipeline {
    pub fn new(
        config: PipelineConfig,
        github: Arc<dyn GitHubApi>,
        builder: Arc<dyn ImageBuilder>,
        bootery: BooteryClient,
    ) -> Self {
        let redactor = Redactor::for_bootery(&config.bootery_url);
        BootPipeline {
            config,
            github,
            builder,
            bootery,
            redactor,
        }
    }

    /// Run against the wall clock.
    pub async fn run(&self) -> PipelineOutcome {
        self.run_at(Utc::now()).await
    }

    /// Run as if started at `now`.
    ///
    /// `now` determines the `boot-newer` gate and the gist file name.
    pub async fn run_at(&self, now: DateTime<Utc>) -> PipelineOutcome {
        let mut tracker = StateTracker::new();
        info!(
            pr = %self.config.pull_request,
            update_root = self.config.update_root,
            "Starting boot test pipeline"
        );

        match self.execute(now, &mut tracker).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let reason = self.redactor.redact(&err.source.to_string());
                error!(
                    stage = %err.stage,
                    state = %tracker.state(),
                    reason = %reason,
                    "Boot test pipeline failed"
                );
                PipelineOutcome::Failed {
                    stage: err.stage,
                    reason,
                }
            }
        }
    }

    async fn execute(
        &self,
        now: DateTime<Utc>,
        tracker: &mut StateTracker,
    ) -> Result<PipelineOutcome, StageError> {
        let pr = &self.config.pull_request;
        let github = self.github.as_ref();

        match check_required_label(github, pr, &self.config.require_label).await {
            Ok(()) => tracker.advance(PipelineState::Gated),
            Err(err @ CiError::LabelNotFound { .. }) => {
                info!("{}, nothing to do", err);
                return Ok(PipelineOutcome::Skipped {
                    label: self.config.require_label.clone(),
                });
            }
            Err(err) => return Err(err).at(Stage::Gate),
        }

        // Build timestamps have whole-second granularity; subtracting one
        // makes the fresh build strictly newer than the gate.
        let newer_than = now.timestamp() - 1;
        let slug = pr.slug();

        let images = self.builder.build().await.at(Stage::Build)?;
        tracker.advance(PipelineState::Built);

        if self.config.update_root {
            self.bootery
                .update_root(images.root_path(), &self.config.bootery_url, &slug)
                .await
                .at(Stage::RootUpdate)?;
            tracker.advance(PipelineState::RootUpdated);
        }

        let url = boot_test_url(&self.config.bootery_url, self.config.update_root)
            .at(Stage::BootTest)?;
        let boot_log = self
            .bootery
            .test_boot(images.boot_path(), &url, &slug, newer_than)
            .await
            .at(Stage::BootTest)?;
        drop(images);
        tracker.advance(PipelineState::BootTested);

        let log_url = publish_boot_log(github, &boot_log, now)
            .await
            .at(Stage::Publish)?;
        tracker.advance(PipelineState::LogPublished);

        report_success(
            github,
            pr,
            &log_url,
            &self.config.set_label,
            &self.config.require_label,
            tracker,
        )
        .await?;
        tracker.advance(PipelineState::Done);

        info!(log_url = %log_url, "Boot test pipeline succeeded");
        Ok(PipelineOutcome::Succeeded { log_url })
    }
}
