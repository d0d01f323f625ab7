//! Boot log publishing.

use crate::github::{GitHubApi, Snippet};
use crate::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

/// Description of every published boot log gist.
pub const GIST_DESCRIPTION: &str = "gokrazy boot log";

/// Gist file name for a log captured at `now`.
pub fn log_filename(now: DateTime<Utc>) -> String {
    format!(
        "boot-log-{}",
        now.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Publish `log` as a private gist and return its URL.
pub async fn publish_boot_log(api: &dyn GitHubApi, log: &str, now: DateTime<Utc>) -> Result<String> {
    let snippet = Snippet {
        description: GIST_DESCRIPTION.to_string(),
        filename: log_filename(now),
        content: log.to_string(),
        public: false,
    };

    let url = api.create_snippet(&snippet).await?;
    info!(url = %url, bytes = log.len(), "Published boot log");
    Ok(url)
}
