//! Label gate: only pull requests carrying the required label get tested.

use crate::config::PullRequestRef;
use crate::error::CiError;
use crate::github::GitHubApi;
use crate::Result;
use tracing::debug;

/// Check that `label` is currently set on the pull request issue.
///
/// Returns `CiError::LabelNotFound` when it is absent. Failures of the
/// listing call itself are returned unchanged.
pub async fn check_required_label(
    api: &dyn GitHubApi,
    pr: &PullRequestRef,
    label: &str,
) -> Result<()> {
    let labels = api.list_labels(pr).await?;
    debug!(pr = %pr, labels = ?labels.names(), "Fetched issue labels");

    if labels.contains(label) {
        Ok(())
    } else {
        Err(CiError::LabelNotFound {
            label: label.to_string(),
            issue: pr.issue_number,
        })
    }
}
