//! Pipeline steps and states.

use crate::error::CiError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A side-effecting step of the boot-test pipeline, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// List PR labels and check the required one.
    Gate,

    /// Pack boot and root images.
    Build,

    /// Stream the root image to `/updateroot`.
    RootUpdate,

    /// Stream the boot image to `/testboot`.
    BootTest,

    /// Publish the boot log as a gist.
    Publish,

    /// Comment on the PR with the log URL.
    Comment,

    /// Add the success label.
    AddLabel,

    /// Remove the required label.
    RemoveLabel,
}

impl Stage {
    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Gate => "gate",
            Stage::Build => "build",
            Stage::RootUpdate => "root_update",
            Stage::BootTest => "boot_test",
            Stage::Publish => "publish",
            Stage::Comment => "comment",
            Stage::AddLabel => "add_label",
            Stage::RemoveLabel => "remove_label",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress of a run. Transitions only move forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Start,
    Gated,
    Built,
    RootUpdated,
    BootTested,
    LogPublished,
    Commented,
    Labeled,
    Done,
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Start => "start",
            PipelineState::Gated => "gated",
            PipelineState::Built => "built",
            PipelineState::RootUpdated => "root_updated",
            PipelineState::BootTested => "boot_tested",
            PipelineState::LogPublished => "log_published",
            PipelineState::Commented => "commented",
            PipelineState::Labeled => "labeled",
            PipelineState::Done => "done",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Current [`PipelineState`] of a run plus the states it went through.
#[derive(Debug, Clone)]
pub struct StateTracker {
    history: Vec<PipelineState>,
}

impl StateTracker {
    pub fn new() -> Self {
        StateTracker {
            history: vec![PipelineState::Start],
        }
    }

    pub fn state(&self) -> PipelineState {
        // history always holds at least Start
        self.history[self.history.len() - 1]
    }

    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    /// Move to `next`. Backward or repeated transitions are ignored.
    pub fn advance(&mut self, next: PipelineState) {
        let current = self.state();
        if next <= current {
            warn!(from = %current, to = %next, "Ignoring backward state transition");
            return;
        }
        info!(from = %current, to = %next, "Pipeline state");
        self.history.push(next);
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// An error tagged with the stage it happened in.
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub source: CiError,
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.stage, self.source)
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Attach a [`Stage`] to a failed result.
pub trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageError>;
}

impl<T, E: Into<CiError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|e| StageError {
            stage,
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Gate.name(), "gate");
        assert_eq!(Stage::RootUpdate.name(), "root_update");
        assert_eq!(Stage::BootTest.to_string(), "boot_test");
        assert_eq!(Stage::RemoveLabel.to_string(), "remove_label");
    }

    #[test]
    fn test_states_are_ordered() {
        assert!(PipelineState::Start < PipelineState::Gated);
        assert!(PipelineState::Built < PipelineState::RootUpdated);
        assert!(PipelineState::RootUpdated < PipelineState::BootTested);
        assert!(PipelineState::Labeled < PipelineState::Done);
    }

    #[test]
    fn test_tracker_moves_forward_only() {
        let mut tracker = StateTracker::new();
        tracker.advance(PipelineState::Gated);
        tracker.advance(PipelineState::Built);
        tracker.advance(PipelineState::Gated);
        tracker.advance(PipelineState::BootTested);

        assert_eq!(tracker.state(), PipelineState::BootTested);
        assert_eq!(
            tracker.history(),
            &[
                PipelineState::Start,
                PipelineState::Gated,
                PipelineState::Built,
                PipelineState::BootTested,
            ]
        );
    }

    #[test]
    fn test_at_stage_tags_error() {
        let result: Result<(), CiError> = Err(CiError::RemoteApi("boom".to_string()));
        let err = result.at(Stage::Publish).unwrap_err();
        assert_eq!(err.stage, Stage::Publish);
        assert_eq!(err.to_string(), "publish: GitHub API error: boom");
    }
}
