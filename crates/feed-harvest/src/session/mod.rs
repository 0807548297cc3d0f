// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Browsing-session abstraction.
//!
//! Defines the `BrowserSession` and `PageElement` traits the harvester drives.
//! The real implementation is Chromium via chromiumoxide; tests plug in an
//! in-memory DOM. Every call against one session is issued sequentially;
//! only the response stream runs alongside.

pub mod chromium;
pub(crate) mod script;

use crate::collector::EndpointMatcher;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// One backend response seen by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedResponse {
    pub url: String,
    /// `None` when the body could not be read (already drained, evicted, ...).
    pub body: Option<String>,
}

/// Responses in arrival order.
pub type ResponseStream = BoxStream<'static, ObservedResponse>;

/// The region whose scroll position drives lazy loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "locator", rename_all = "snake_case")]
pub enum ScrollRegion {
    /// A dedicated feed container.
    Container(String),
    /// The parent of the first element matching the item locator.
    ItemParent(String),
    /// The top-level document.
    Viewport,
}

impl std::fmt::Display for ScrollRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Container(locator) => write!(f, "container `{locator}`"),
            Self::ItemParent(locator) => write!(f, "parent of `{locator}`"),
            Self::Viewport => write!(f, "viewport"),
        }
    }
}

/// A handle to one element in the current DOM snapshot.
///
/// Handles may go stale when the page re-renders; callers read what they
/// need in one pass and drop them.
#[async_trait]
pub trait PageElement: Send + Sync {
    /// All descendants matching `locator`, in document order.
    async fn find_all(&self, locator: &str) -> Result<Vec<Box<dyn PageElement>>>;
    /// Rendered text.
    async fn text(&self) -> Result<String>;
    /// Inner markup.
    async fn markup(&self) -> Result<String>;
    async fn attribute(&self, name: &str) -> Result<Option<String>>;
    /// A DOM property (e.g. the resolved `src`), stringified.
    async fn property(&self, name: &str) -> Result<Option<String>>;
    /// Whether the element is rendered. Hidden elements stay in the DOM.
    async fn is_visible(&self) -> Result<bool>;
    /// Click the element.
    async fn activate(&self) -> Result<()>;
    /// Focus the element and type into it.
    async fn type_text(&self, text: &str) -> Result<()>;

    /// The first descendant matching `locator`.
    async fn find(&self, locator: &str) -> Result<Option<Box<dyn PageElement>>> {
        Ok(self.find_all(locator).await?.into_iter().next())
    }
}

/// An authenticated browsing context.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Wait for an in-flight navigation (e.g. after a form submit) to settle.
    async fn wait_for_navigation(&self, timeout_ms: u64) -> Result<()>;
    /// Get the current URL.
    async fn current_url(&self) -> Result<String>;
    /// All elements matching `locator`, in document order.
    async fn find_all(&self, locator: &str) -> Result<Vec<Box<dyn PageElement>>>;
    /// Press and release a key against the page.
    async fn press_key(&self, key: &str) -> Result<()>;
    /// Scroll `region` to its end and fire the scroll/resize events lazy
    /// loaders listen for.
    async fn scroll_to_end(&self, region: &ScrollRegion) -> Result<()>;
    /// Scrollable content height of `region` (0 when it does not exist).
    async fn scroll_extent(&self, region: &ScrollRegion) -> Result<f64>;
    /// Start observing responses. Only responses arriving after this call
    /// are seen; bodies are fetched for URLs `interest` matches.
    async fn responses(&self, interest: EndpointMatcher) -> Result<ResponseStream>;

    /// The first element matching `locator`.
    async fn find(&self, locator: &str) -> Result<Option<Box<dyn PageElement>>> {
        Ok(self.find_all(locator).await?.into_iter().next())
    }
}
