// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Fatal error taxonomy for a harvest run.
//!
//! Only conditions that must abort the whole run live here. Degraded
//! outcomes (pagination timing out, an empty field, a preview that never
//! opened, a non-JSON response body) are logged and counted in
//! [`HarvestStats`](crate::harvest::HarvestStats) instead.

use std::path::PathBuf;

/// All errors that abort a harvest run.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    /// The session never reached the post-login location.
    #[error("session is not authenticated: ended up at {url}")]
    NotAuthenticated { url: String },

    /// A login form field or button could not be located.
    #[error("login form element not found: `{locator}`")]
    LoginFormMissing { locator: String },

    /// The first batch of feed items never rendered.
    #[error("feed never rendered: nothing matched `{locator}` within {timeout_ms}ms")]
    FeedNeverRendered { locator: String, timeout_ms: u64 },

    /// Navigation to a required page failed outright.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The configuration is internally inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read configuration {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The browsing session itself failed (browser crashed, CDP error, ...).
    #[error(transparent)]
    Browser(#[from] anyhow::Error),
}

impl HarvestError {
    /// Short machine-readable label for the failed precondition.
    pub fn kind(&self) -> &'static str {
        match self {
            HarvestError::NotAuthenticated { .. } => "not_authenticated",
            HarvestError::LoginFormMissing { .. } => "login_form_missing",
            HarvestError::FeedNeverRendered { .. } => "feed_never_rendered",
            HarvestError::Navigation { .. } => "navigation",
            HarvestError::Config(_) | HarvestError::ConfigIo { .. } | HarvestError::ConfigParse(_) => {
                "config"
            }
            HarvestError::Browser(_) => "browser",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failed_precondition() {
        let err = HarvestError::FeedNeverRendered {
            locator: "div.card".to_string(),
            timeout_ms: 15000,
        };
        assert_eq!(
            err.to_string(),
            "feed never rendered: nothing matched `div.card` within 15000ms"
        );
        assert_eq!(err.kind(), "feed_never_rendered");

        let err = HarvestError::NotAuthenticated {
            url: "https://example.com/login".to_string(),
        };
        assert!(err.to_string().contains("https://example.com/login"));
    }

    #[test]
    fn test_browser_errors_are_transparent() {
        let err: HarvestError = anyhow::anyhow!("target closed").into();
        assert_eq!(err.to_string(), "target closed");
        assert_eq!(err.kind(), "browser");
    }
}
