//! Run configuration, built once at startup and handed to the pipeline.

use crate::error::CiError;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Pull request under test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
}

impl PullRequestRef {
    /// Parse an `owner/repo` slug and a decimal pull request number.
    pub fn parse(slug: &str, pull_request: &str) -> Result<Self> {
        let parts: Vec<&str> = slug.split('/').collect();
        if parts.len() != 2 {
            return Err(CiError::Config(format!(
                "unexpected number of /-separated parts in {:?}: got {}, want 2",
                slug,
                parts.len()
            )));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CiError::Config(format!(
                "slug {:?} has an empty owner or repo",
                slug
            )));
        }

        let issue_number = pull_request.trim().parse::<u64>().map_err(|e| {
            CiError::Config(format!(
                "could not parse pull request {:?} as number: {}",
                pull_request, e
            ))
        })?;

        Ok(PullRequestRef {
            owner: parts[0].to_string(),
            repo: parts[1].to_string(),
            issue_number,
        })
    }

    /// `owner/repo`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl std::fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.issue_number)
    }
}

/// Everything the pipeline needs to know about one run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pull request to test and report on.
    pub pull_request: PullRequestRef,

    /// Label that opts a pull request into boot testing; removed on success.
    pub require_label: String,

    /// Label added on success.
    pub set_label: String,

    /// Bootery `/testboot` URL. Treated as a secret.
    pub bootery_url: String,

    /// Replace the bootery root file system before the boot test.
    pub update_root: bool,
}

impl PipelineConfig {
    /// Reject empty required values.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("bootery_url", &self.bootery_url),
            ("require_label", &self.require_label),
            ("set_label", &self.set_label),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(CiError::Config(format!("{} is required", name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PipelineConfig {
        PipelineConfig {
            pull_request: PullRequestRef::parse("acme/widget", "42").unwrap(),
            require_label: "needs-boot-test".to_string(),
            set_label: "success".to_string(),
            bootery_url: "https://bootery.example/testboot".to_string(),
            update_root: false,
        }
    }

    #[test]
    fn test_parse_pull_request_ref() {
        let pr = PullRequestRef::parse("acme/widget", "42").unwrap();
        assert_eq!(pr.owner, "acme");
        assert_eq!(pr.repo, "widget");
        assert_eq!(pr.issue_number, 42);
        assert_eq!(pr.slug(), "acme/widget");
        assert_eq!(pr.to_string(), "acme/widget#42");
    }

    #[test]
    fn test_parse_rejects_bad_slug() {
        for slug in ["acme", "acme/widget/extra", "/widget", "acme/"] {
            let err = PullRequestRef::parse(slug, "1").unwrap_err();
            assert!(matches!(err, CiError::Config(_)), "slug {slug:?}");
        }
    }

    #[test]
    fn test_parse_rejects_non_numeric_pull_request() {
        let err = PullRequestRef::parse("acme/widget", "false").unwrap_err();
        assert!(matches!(err, CiError::Config(_)));
        assert!(err.to_string().contains("\"false\""));
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_values() {
        let mut c = config();
        c.set_label = " ".to_string();
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("set_label"));

        let mut c = config();
        c.bootery_url.clear();
        assert!(c.validate().is_err());
    }
}
