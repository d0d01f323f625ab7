//! Pull request feedback after a successful boot test.

use crate::config::PullRequestRef;
use crate::github::GitHubApi;
use crate::stage::{AtStage, PipelineState, Stage, StageError, StateTracker};
use tracing::info;

/// Comment body pointing at the published log.
pub fn success_comment(log_url: &str) -> String {
    format!("Boot test successful, find the log at {}", log_url)
}

/// Comment, add `success_label`, then remove `required_label`.
///
/// Stops at the first failure. Earlier steps are not undone.
pub async fn report_success(
    api: &dyn GitHubApi,
    pr: &PullRequestRef,
    log_url: &str,
    success_label: &str,
    required_label: &str,
    tracker: &mut StateTracker,
) -> Result<(), StageError> {
    api.comment(pr, &success_comment(log_url))
        .await
        .at(Stage::Comment)?;
    info!(pr = %pr, "Commented on pull request");
    tracker.advance(PipelineState::Commented);

    api.add_label(pr, success_label).await.at(Stage::AddLabel)?;
    info!(pr = %pr, label = success_label, "Added label");

    api.remove_label(pr, required_label)
        .await
        .at(Stage::RemoveLabel)?;
    info!(pr = %pr, label = required_label, "Removed label");
    tracker.advance(PipelineState::Labeled);

    Ok(())
}
