//! Bootery URL redaction.
//!
//! The bootery URL grants access to real hardware, so it must not show up
//! in CI logs or PR comments. Error messages from the HTTP stack embed the
//! request URL; [`Redactor`] rewrites every known spelling of it.

use bootery_client::update_root_url;
use reqwest::Url;

/// Replacement text for the bootery URL.
pub const PLACEHOLDER: &str = "<bootery_url>";

#[derive(Debug, Clone)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    /// Redact `bootery_url` and the root-update URL derived from it, as
    /// configured and in normalized form.
    pub fn for_bootery(bootery_url: &str) -> Self {
        let mut secrets = Vec::new();
        for raw in [bootery_url.to_string(), update_root_url(bootery_url)] {
            if let Ok(parsed) = Url::parse(&raw) {
                secrets.push(parsed.to_string());
            }
            secrets.push(raw);
        }
        secrets.retain(|s| !s.is_empty());
        // Longest first so a secret never leaves a tail of a longer one behind.
        secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        secrets.dedup();

        Redactor { secrets }
    }

    pub fn redact(&self, message: &str) -> String {
        self.secrets
            .iter()
            .fold(message.to_string(), |msg, secret| msg.replace(secret.as_str(), PLACEHOLDER))
    }
}
