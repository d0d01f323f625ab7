//! GitHub capabilities used by the pipeline.
//!
//! [`GitHubApi`] is the narrow surface the pipeline depends on: issue
//! labels, issue comments and gists. [`GitHubClient`] implements it over
//! the REST API; `fakes::FakeGitHub` implements it in memory.

use crate::config::PullRequestRef;
use crate::error::CiError;
use crate::Result;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

/// Default REST API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const LABELS_PER_PAGE: usize = 100;

/// Labels on an issue, in the order GitHub returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new(labels: Vec<String>) -> Self {
        LabelSet(labels)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|l| l == name)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl FromIterator<String> for LabelSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        LabelSet(iter.into_iter().collect())
    }
}

/// A single-file gist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub description: String,
    pub filename: String,
    pub content: String,
    pub public: bool,
}

/// Issue and gist operations needed to gate and report a pull request.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Current labels of the pull request issue.
    async fn list_labels(&self, pr: &PullRequestRef) -> Result<LabelSet>;

    /// Add `name` to the issue.
    async fn add_label(&self, pr: &PullRequestRef, name: &str) -> Result<()>;

    /// Remove `name` from the issue.
    async fn remove_label(&self, pr: &PullRequestRef, name: &str) -> Result<()>;

    /// Post a comment on the issue.
    async fn comment(&self, pr: &PullRequestRef, body: &str) -> Result<()>;

    /// Create a gist and return its browsable URL.
    async fn create_snippet(&self, snippet: &Snippet) -> Result<String>;
}

/// Credentials and endpoint for the REST API.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// API root, e.g. `https://api.github.com` or `https://ghe.example/api/v3`.
    pub api_url: String,
    /// User the token belongs to.
    pub user: String,
    /// Personal access token.
    pub token: String,
}

impl GitHubConfig {
    pub fn new(user: &str, token: &str) -> Self {
        GitHubConfig {
            api_url: DEFAULT_API_URL.to_string(),
            user: user.to_string(),
            token: token.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }
}

#[derive(Deserialize)]
struct Label {
    name: String,
}

#[derive(Serialize)]
struct GistFile<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct Gist {
    html_url: String,
}

/// [`GitHubApi`] over the GitHub REST API with basic authentication.
pub struct GitHubClient {
    config: GitHubConfig,
    api_root: Url,
    http: reqwest::Client,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let api_root = Url::parse(&config.api_url)
            .map_err(|e| CiError::Config(format!("invalid GitHub API URL: {}", e)))?;
        if api_root.cannot_be_a_base() {
            return Err(CiError::Config(format!(
                "GitHub API URL {:?} cannot be a base",
                config.api_url
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("bootgate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(GitHubClient {
            config,
            api_root,
            http,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_root.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn issue_endpoint(&self, pr: &PullRequestRef, rest: &[&str]) -> Url {
        let number = pr.issue_number.to_string();
        let mut segments = vec![
            "repos",
            pr.owner.as_str(),
            pr.repo.as_str(),
            "issues",
            number.as_str(),
        ];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        debug!(%method, %url, "GitHub API request");
        self.http
            .request(method, url)
            .basic_auth(&self.config.user, Some(&self.config.token))
            .header(ACCEPT, "application/vnd.github+json")
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CiError::RemoteApi(format!(
            "{}: {} ({})",
            what,
            status,
            body.trim()
        )))
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn list_labels(&self, pr: &PullRequestRef) -> Result<LabelSet> {
        let mut labels = Vec::new();
        let mut page = 1usize;
        loop {
            let mut url = self.issue_endpoint(pr, &["labels"]);
            url.query_pairs_mut()
                .append_pair("per_page", &LABELS_PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            let response = self
                .send(self.request(Method::GET, url), "list labels")
                .await?;
            let batch: Vec<Label> = serde_json::from_slice(&response.bytes().await?)?;
            let done = batch.len() < LABELS_PER_PAGE;
            labels.extend(batch.into_iter().map(|l| l.name));
            if done {
                break;
            }
            page += 1;
        }
        Ok(LabelSet::new(labels))
    }

    async fn add_label(&self, pr: &PullRequestRef, name: &str) -> Result<()> {
        let url = self.issue_endpoint(pr, &["labels"]);
        self.send(
            self.request(Method::POST, url)
                .json(&json!({ "labels": [name] })),
            "add label",
        )
        .await?;
        Ok(())
    }

    async fn remove_label(&self, pr: &PullRequestRef, name: &str) -> Result<()> {
        let url = self.issue_endpoint(pr, &["labels", name]);
        self.send(self.request(Method::DELETE, url), "remove label")
            .await?;
        Ok(())
    }

    async fn comment(&self, pr: &PullRequestRef, body: &str) -> Result<()> {
        let url = self.issue_endpoint(pr, &["comments"]);
        self.send(
            self.request(Method::POST, url).json(&json!({ "body": body })),
            "create comment",
        )
        .await?;
        Ok(())
    }

    async fn create_snippet(&self, snippet: &Snippet) -> Result<String> {
        let mut files = BTreeMap::new();
        files.insert(
            snippet.filename.as_str(),
            GistFile {
                content: &snippet.content,
            },
        );

        let url = self.endpoint(&["gists"]);
        let response = self
            .send(
                self.request(Method::POST, url).json(&json!({
                    "description": snippet.description,
                    "public": snippet.public,
                    "files": files,
                })),
                "create gist",
            )
            .await?;
        let gist: Gist = serde_json::from_slice(&response.bytes().await?)?;
        Ok(gist.html_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr() -> PullRequestRef {
        PullRequestRef::parse("acme/widget", "42").unwrap()
    }

    #[test]
    fn test_label_set_contains() {
        let labels: LabelSet = ["bug", "needs-boot-test"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(labels.contains("needs-boot-test"));
        assert!(!labels.contains("needs-boot"));
        assert_eq!(labels.names().len(), 2);
    }

    #[test]
    fn test_issue_endpoint() {
        let client = GitHubClient::new(GitHubConfig::new("u", "t")).unwrap();
        let url = client.issue_endpoint(&pr(), &["labels"]);
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/widget/issues/42/labels"
        );
    }

    #[test]
    fn test_issue_endpoint_encodes_label_name() {
        let client = GitHubClient::new(
            GitHubConfig::new("u", "t").with_api_url("https://ghe.example/api/v3/"),
        )
        .unwrap();
        let url = client.issue_endpoint(&pr(), &["labels", "needs boot/test"]);
        assert_eq!(
            url.as_str(),
            "https://ghe.example/api/v3/repos/acme/widget/issues/42/labels/needs%20boot%2Ftest"
        );
    }

    #[test]
    fn test_invalid_api_url_is_config_error() {
        let err = GitHubClient::new(GitHubConfig::new("u", "t").with_api_url("nope"))
            .err()
            .unwrap();
        assert!(matches!(err, CiError::Config(_)));
    }
}
