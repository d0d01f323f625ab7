//! Error types for bootgate-ci

use bootery_client::BooteryError;
use thiserror::Error;

/// Errors that can occur while gating, testing or reporting a pull request
#[derive(Error, Debug)]
pub enum CiError {
    /// Required input missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// The pull request is not opted into boot testing
    #[error("label {label:?} not found on issue {issue}")]
    LabelNotFound { label: String, issue: u64 },

    /// GitHub REST API call failed
    #[error("GitHub API error: {0}")]
    RemoteApi(String),

    /// Packing or streaming failed
    #[error(transparent)]
    Bootery(#[from] BooteryError),
}

impl From<reqwest::Error> for CiError {
    fn from(err: reqwest::Error) -> Self {
        CiError::RemoteApi(err.to_string())
    }
}

impl From<serde_json::Error> for CiError {
    fn from(err: serde_json::Error) -> Self {
        CiError::RemoteApi(format!("malformed response: {}", err))
    }
}
