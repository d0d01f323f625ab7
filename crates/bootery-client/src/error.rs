//! Error types for bootery-client

use thiserror::Error;

/// Errors that can occur while packing images or talking to a bootery
#[derive(Error, Debug)]
pub enum BooteryError {
    /// IO error (temp files, image files, spawning the packer)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootery URL could not be parsed
    #[error("Invalid bootery URL: {0}")]
    InvalidUrl(String),

    /// Packer exited unsuccessfully
    #[error("{program} failed: {}", describe_exit(.code))]
    Build {
        program: String,
        code: Option<i32>,
    },

    /// Request never produced an HTTP response
    #[error("HTTP error: {0}")]
    Transport(String),

    /// Bootery answered with something other than 200 OK
    #[error("unexpected HTTP status code: got {status} ({body}), want 200")]
    UnexpectedStatus { status: u16, body: String },
}

impl From<reqwest::Error> for BooteryError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries bootery credentials; keep it out of the message.
        BooteryError::Transport(err.without_url().to_string())
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}
