// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Harvest configuration: locators, timeouts, and the enabled strategies.
//!
//! Every field has a default, so a config file only needs to name what it
//! overrides. Resolution order for the file itself:
//! 1. an explicit path (the `--config` flag)
//! 2. `HARVEST_CONFIG` env
//! 3. `./feed-harvest.json` if it exists
//! 4. built-in defaults

use crate::error::HarvestError;
use crate::poller::PollSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Name of the config file picked up from the working directory.
pub const LOCAL_CONFIG_FILE: &str = "feed-harvest.json";

const DEFAULT_FEED_URL: &str = "https://nlp.nexterp.in/nlp/nlp/v1/workspace/studentlms?urlgroup=Student%20Workspace#/dashboard/discussion";
const DEFAULT_LOGIN_URL: &str = "https://nlp.nexterp.in/nlp/nlp/login";

/// Which acquisition strategies a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Scrape the rendered feed items.
    #[default]
    Dom,
    /// Capture the backend responses that back the feed.
    Network,
    /// Both, in the same pass.
    Both,
}

impl Strategy {
    pub fn scrapes_dom(self) -> bool {
        matches!(self, Strategy::Dom | Strategy::Both)
    }

    pub fn captures_network(self) -> bool {
        matches!(self, Strategy::Network | Strategy::Both)
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dom" => Ok(Strategy::Dom),
            "network" | "net" => Ok(Strategy::Network),
            "both" => Ok(Strategy::Both),
            other => Err(format!("unknown strategy '{other}' (expected dom, network, or both)")),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Dom => write!(f, "dom"),
            Strategy::Network => write!(f, "network"),
            Strategy::Both => write!(f, "both"),
        }
    }
}

/// One step of a field-extraction chain.
///
/// Chains are tried in order; the first step yielding a non-empty trimmed
/// value wins. A step with `stop_if_present` also ends the chain when its
/// element exists but is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSource {
    /// Rendered text of the first match.
    Text {
        locator: String,
        #[serde(default, skip_serializing_if = "is_false")]
        stop_if_present: bool,
    },
    /// Inner markup of the first match.
    Markup {
        locator: String,
        #[serde(default, skip_serializing_if = "is_false")]
        stop_if_present: bool,
    },
    /// Text of the `index`-th match, with an optional case-insensitive
    /// leading prefix removed.
    DetailLine {
        locator: String,
        index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strip_prefix: Option<String>,
    },
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl FieldSource {
    fn text(locator: &str) -> Self {
        FieldSource::Text {
            locator: locator.to_string(),
            stop_if_present: false,
        }
    }

    /// Markup that is authoritative whenever its element exists.
    fn markup_if_present(locator: &str) -> Self {
        FieldSource::Markup {
            locator: locator.to_string(),
            stop_if_present: true,
        }
    }

    fn detail_line(locator: &str, index: usize, strip_prefix: Option<&str>) -> Self {
        FieldSource::DetailLine {
            locator: locator.to_string(),
            index,
            strip_prefix: strip_prefix.map(String::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub interval_ms: u64,
    pub stable_rounds: u32,
    pub max_duration_ms: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            stable_rounds: 3,
            max_duration_ms: 30_000,
        }
    }
}

impl PaginationConfig {
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.interval_ms),
            stable_rounds: self.stable_rounds,
            max_duration: Duration::from_millis(self.max_duration_ms),
        }
    }
}

/// The shared preview surface that reveals interactive attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// The overlay itself; its presence means "open".
    pub locator: String,
    /// Content pane inside the overlay.
    pub content_locator: String,
    /// Media reference inside the content pane.
    pub media_locator: String,
    pub appear_timeout_ms: u64,
    pub dismiss_timeout_ms: u64,
    pub dismiss_key: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            locator: "div.galleryorginal".to_string(),
            content_locator: "div.galleryorginal .gallery-img".to_string(),
            media_locator: "embed, img, video source, audio".to_string(),
            appear_timeout_ms: 8_000,
            dismiss_timeout_ms: 5_000,
            dismiss_key: "Escape".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Title element carrying the item's category.
    pub category_locator: String,
    /// Categories (compared trimmed and lowercased) that are never emitted.
    pub excluded_categories: Vec<String>,
    pub teacher: Vec<FieldSource>,
    pub datetime: Vec<FieldSource>,
    pub content: Vec<FieldSource>,
    pub attachment_card_locator: String,
    /// Media source that can be read without opening the preview.
    pub inline_media_locator: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        const HEADER: &str = "div.descTitleContent.layout-align-center-start";
        const DETAILS: &str = "ul.feed-details li";
        Self {
            category_locator: "md-card.postLink p.postTitle".to_string(),
            excluded_categories: vec!["resource".to_string()],
            teacher: vec![
                FieldSource::text(&format!("{HEADER} h3")),
                FieldSource::detail_line(DETAILS, 0, Some("By")),
            ],
            datetime: vec![
                FieldSource::text(&format!("{HEADER} span.direction-normal")),
                FieldSource::detail_line(DETAILS, 1, None),
            ],
            content: vec![
                // an empty footer means an attachment-only post
                FieldSource::markup_if_present("div.disc-footer h3"),
                FieldSource::text("div.descTitleContent p"),
            ],
            attachment_card_locator: "div.post-details-card.cursor".to_string(),
            inline_media_locator: "video source".to_string(),
        }
    }
}

/// Locators for the login collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    pub url: String,
    pub username_locator: String,
    pub password_locator: String,
    pub code_locator: String,
    pub submit_locator: String,
    /// Substring of the URL reached after a successful login.
    pub success_marker: String,
    /// Substring of the URL a session is bounced to when it is not
    /// authenticated.
    pub login_marker: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LOGIN_URL.to_string(),
            username_locator: r#"input[name="username"]"#.to_string(),
            password_locator: r#"input[name="password"]"#.to_string(),
            code_locator: r#"input[name="code"]"#.to_string(),
            submit_locator: r#"button[name="btnSignIn"]"#.to_string(),
            success_marker: "student-dashboard".to_string(),
            login_marker: "/login".to_string(),
        }
    }
}

/// Full configuration for one harvest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub feed_url: String,
    pub item_locator: String,
    /// Scrollable feed container candidates, tried in order.
    pub container_locators: Vec<String>,
    /// Substring a response URL must contain to be captured.
    pub endpoint_pattern: String,
    pub strategy: Strategy,
    pub navigation_timeout_ms: u64,
    pub first_render_timeout_ms: u64,
    pub pagination: PaginationConfig,
    pub overlay: OverlayConfig,
    pub extraction: ExtractionConfig,
    pub login: LoginConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            item_locator: "div.discussion-card.ng-scope".to_string(),
            container_locators: vec![
                "div.discussion-container".to_string(),
                "md-content.md-default-theme".to_string(),
            ],
            endpoint_pattern: "discussion".to_string(),
            strategy: Strategy::default(),
            navigation_timeout_ms: 30_000,
            first_render_timeout_ms: 15_000,
            pagination: PaginationConfig::default(),
            overlay: OverlayConfig::default(),
            extraction: ExtractionConfig::default(),
            login: LoginConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Load a config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, HarvestError> {
        let raw = std::fs::read_to_string(path).map_err(|source| HarvestError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: HarvestConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the resolved config path, or fall back to defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, HarvestError> {
        match resolve_config_path(explicit) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading harvest config");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.item_locator.trim().is_empty() {
            return Err(HarvestError::Config("item_locator must not be empty".into()));
        }
        if self.feed_url.trim().is_empty() {
            return Err(HarvestError::Config("feed_url must not be empty".into()));
        }
        if self.pagination.stable_rounds == 0 {
            return Err(HarvestError::Config(
                "pagination.stable_rounds must be at least 1".into(),
            ));
        }
        if self.pagination.interval_ms == 0 {
            return Err(HarvestError::Config(
                "pagination.interval_ms must be greater than zero".into(),
            ));
        }
        if self.strategy.captures_network() && self.endpoint_pattern.is_empty() {
            return Err(HarvestError::Config(
                "endpoint_pattern is required when network capture is enabled".into(),
            ));
        }
        Ok(())
    }
}

/// Find the config file to load, if any.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var("HARVEST_CONFIG") {
        if !env_path.is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    None
}
