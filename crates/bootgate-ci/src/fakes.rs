//! In-memory fakes for the pipeline capabilities (testing only)
//!
//! Provides `FakeGitHub` and `FakeImageBuilder`, which satisfy the
//! `GitHubApi` and `ImageBuilder` contracts without network access or a
//! packer installation.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use bootery_client::{BooteryError, ImageBuilder, ImagePair};

use crate::config::PullRequestRef;
use crate::error::CiError;
use crate::github::{GitHubApi, LabelSet, Snippet};
use crate::Result;

// ---------------------------------------------------------------------------
// FakeGitHub
// ---------------------------------------------------------------------------

/// A `GitHubApi` operation, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubOp {
    ListLabels,
    AddLabel,
    RemoveLabel,
    Comment,
    CreateSnippet,
}

/// One recorded call, in the order it was attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubCall {
    ListLabels { issue: u64 },
    AddLabel { issue: u64, name: String },
    RemoveLabel { issue: u64, name: String },
    Comment { issue: u64, body: String },
    CreateSnippet(Snippet),
}

/// In-memory GitHub with a single issue's labels.
#[derive(Debug)]
pub struct FakeGitHub {
    labels: Mutex<Vec<String>>,
    calls: Mutex<Vec<GitHubCall>>,
    fail_on: Option<GitHubOp>,
    gist_url: String,
}

impl FakeGitHub {
    pub fn with_labels(labels: &[&str]) -> Self {
        FakeGitHub {
            labels: Mutex::new(labels.iter().map(|l| l.to_string()).collect()),
            calls: Mutex::new(Vec::new()),
            fail_on: None,
            gist_url: "https://gist.github.com/bakery/0123456789abcdef".to_string(),
        }
    }

    /// Make every call of `op` fail with `CiError::RemoteApi`.
    pub fn failing_on(mut self, op: GitHubOp) -> Self {
        self.fail_on = Some(op);
        self
    }

    /// URL returned for created gists.
    pub fn gist_url(&self) -> String {
        self.gist_url.clone()
    }

    pub fn calls(&self) -> Vec<GitHubCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.lock().unwrap().clone()
    }

    pub fn comments(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GitHubCall::Comment { body, .. } => Some(body),
                _ => None,
            })
            .collect()
    }

    fn attempt(&self, op: GitHubOp, call: GitHubCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail_on == Some(op) {
            return Err(CiError::RemoteApi(format!("injected failure: {:?}", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn list_labels(&self, pr: &PullRequestRef) -> Result<LabelSet> {
        self.attempt(
            GitHubOp::ListLabels,
            GitHubCall::ListLabels {
                issue: pr.issue_number,
            },
        )?;
        Ok(self.labels().into_iter().collect())
    }

    async fn add_label(&self, pr: &PullRequestRef, name: &str) -> Result<()> {
        self.attempt(
            GitHubOp::AddLabel,
            GitHubCall::AddLabel {
                issue: pr.issue_number,
                name: name.to_string(),
            },
        )?;
        let mut labels = self.labels.lock().unwrap();
        if !labels.iter().any(|l| l == name) {
            labels.push(name.to_string());
        }
        Ok(())
    }

    async fn remove_label(&self, pr: &PullRequestRef, name: &str) -> Result<()> {
        self.attempt(
            GitHubOp::RemoveLabel,
            GitHubCall::RemoveLabel {
                issue: pr.issue_number,
                name: name.to_string(),
            },
        )?;
        let mut labels = self.labels.lock().unwrap();
        let before = labels.len();
        labels.retain(|l| l != name);
        if labels.len() == before {
            return Err(CiError::RemoteApi(format!(
                "remove label: 404 Not Found (Label does not exist: {})",
                name
            )));
        }
        Ok(())
    }

    async fn comment(&self, pr: &PullRequestRef, body: &str) -> Result<()> {
        self.attempt(
            GitHubOp::Comment,
            GitHubCall::Comment {
                issue: pr.issue_number,
                body: body.to_string(),
            },
        )
    }

    async fn create_snippet(&self, snippet: &Snippet) -> Result<String> {
        self.attempt(
            GitHubOp::CreateSnippet,
            GitHubCall::CreateSnippet(snippet.clone()),
        )?;
        Ok(self.gist_url.clone())
    }
}

// ---------------------------------------------------------------------------
// FakeImageBuilder
// ---------------------------------------------------------------------------

/// `ImageBuilder` that writes fixed bytes instead of running a packer.
#[derive(Debug)]
pub struct FakeImageBuilder {
    boot: Vec<u8>,
    root: Vec<u8>,
    fail: bool,
    built: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl FakeImageBuilder {
    pub fn new() -> Self {
        FakeImageBuilder {
            boot: b"fake boot image".to_vec(),
            root: b"fake root image".to_vec(),
            fail: false,
            built: Mutex::new(Vec::new()),
        }
    }

    /// Write the images, then report a packer failure.
    pub fn failing() -> Self {
        FakeImageBuilder {
            fail: true,
            ..Self::new()
        }
    }

    pub fn boot_image(&self) -> &[u8] {
        &self.boot
    }

    pub fn root_image(&self) -> &[u8] {
        &self.root
    }

    /// `(boot, root)` paths of every build so far.
    pub fn built_paths(&self) -> Vec<(PathBuf, PathBuf)> {
        self.built.lock().unwrap().clone()
    }

    pub fn build_count(&self) -> usize {
        self.built.lock().unwrap().len()
    }
}

impl Default for FakeImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageBuilder for FakeImageBuilder {
    async fn build(&self) -> bootery_client::Result<ImagePair> {
        let images = ImagePair::allocate()?;
        std::fs::write(images.boot_path(), &self.boot)?;
        std::fs::write(images.root_path(), &self.root)?;
        self.built.lock().unwrap().push((
            images.boot_path().to_path_buf(),
            images.root_path().to_path_buf(),
        ));

        if self.fail {
            return Err(BooteryError::Build {
                program: "fake-packer".to_string(),
                code: Some(1),
            });
        }
        Ok(images)
    }
}
