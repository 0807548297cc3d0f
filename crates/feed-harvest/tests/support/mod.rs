// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! In-memory browsing session for integration tests.
//!
//! Locators are matched literally: a node's children are keyed by the exact
//! locator string that finds them. The feed grows by a scripted amount on
//! every scroll, activations can open the shared preview overlay, and the
//! response stream replays a fixed list.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use feed_harvest::collector::EndpointMatcher;
use feed_harvest::config::HarvestConfig;
use feed_harvest::session::{
    BrowserSession, NavigationResult, ObservedResponse, PageElement, ResponseStream, ScrollRegion,
};
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const ITEM: &str = "div.discussion-card.ng-scope";
pub const CATEGORY: &str = "md-card.postLink p.postTitle";
pub const HEADER_AUTHOR: &str = "div.descTitleContent.layout-align-center-start h3";
pub const HEADER_TIME: &str = "div.descTitleContent.layout-align-center-start span.direction-normal";
pub const DETAILS: &str = "ul.feed-details li";
pub const FOOTER: &str = "div.disc-footer h3";
pub const DESCRIPTION: &str = "div.descTitleContent p";
pub const CARD: &str = "div.post-details-card.cursor";
pub const INLINE_MEDIA: &str = "video source";
pub const OVERLAY: &str = "div.galleryorginal";
pub const OVERLAY_PANE: &str = "div.galleryorginal .gallery-img";
pub const OVERLAY_MEDIA: &str = "embed, img, video source, audio";

/// What activating a node does.
#[derive(Debug, Clone, Default)]
pub enum Activation {
    #[default]
    Nothing,
    /// Open the preview overlay showing `src`.
    OpenPreview(String),
    /// Open the preview overlay with nothing inside.
    OpenEmptyPreview,
    /// Navigate the page.
    NavigateTo(String),
}

#[derive(Debug, Clone, Default)]
pub struct FakeNode {
    pub text: String,
    pub markup: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<(String, FakeNode)>,
    pub activation: Activation,
    /// In the DOM but not rendered.
    pub hidden: bool,
}

impl FakeNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn markup(mut self, markup: &str) -> Self {
        self.markup = markup.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, locator: &str, node: FakeNode) -> Self {
        self.children.push((locator.to_string(), node));
        self
    }

    pub fn on_activate(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// A post rendered with the structured header and a footer body.
pub fn post(teacher: &str, datetime: &str, content: &str) -> FakeNode {
    categorized("Post", teacher, datetime, content)
}

/// A post whose category title marks it as a resource.
pub fn resource(title: &str) -> FakeNode {
    categorized(title, "Librarian", "2024-01-01 09:00", "shared file")
}

fn categorized(category: &str, teacher: &str, datetime: &str, content: &str) -> FakeNode {
    FakeNode::new()
        .child(CATEGORY, FakeNode::new().text(category))
        .child(HEADER_AUTHOR, FakeNode::new().text(teacher))
        .child(HEADER_TIME, FakeNode::new().text(datetime))
        .child(FOOTER, FakeNode::new().markup(content))
}

pub fn inline_video_card(src: &str) -> FakeNode {
    FakeNode::new().child(INLINE_MEDIA, FakeNode::new().attr("src", src))
}

pub fn preview_card(src: &str) -> FakeNode {
    FakeNode::new().on_activate(Activation::OpenPreview(src.to_string()))
}

pub fn dead_card() -> FakeNode {
    FakeNode::new()
}

#[derive(Debug, Default)]
struct Feed {
    items: Vec<FakeNode>,
    visible: usize,
    /// Items revealed by each successive scroll; empty means no growth.
    growth: VecDeque<usize>,
}

#[derive(Debug, Default)]
struct DomState {
    url: String,
    feed: Feed,
    /// Static page nodes keyed by locator (containers, login form, ...).
    page: Vec<(String, FakeNode)>,
    redirects: HashMap<String, String>,
    overlay: Option<Activation>,
    /// The overlay is still in the DOM but hidden.
    overlay_hidden: bool,
    /// Escape hides the overlay instead of removing it.
    hide_overlay_on_escape: bool,
    responses: Vec<ObservedResponse>,
    typed: Vec<(String, String)>,
    keys: Vec<String>,
    scrolls: Vec<ScrollRegion>,
    activations: usize,
    /// Activations that happened while the overlay was already open.
    overlapping_activations: usize,
}

/// Scripted session shared by all handles it hands out.
#[derive(Clone, Default)]
pub struct FakeSession {
    state: Arc<Mutex<DomState>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed items; `initially_visible` render on navigation, each scroll
    /// reveals the next entry of `growth`.
    pub fn with_feed(self, items: Vec<FakeNode>, initially_visible: usize, growth: &[usize]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.feed = Feed {
                items,
                visible: initially_visible,
                growth: growth.iter().copied().collect(),
            };
        }
        self
    }

    pub fn with_page_node(self, locator: &str, node: FakeNode) -> Self {
        self.state
            .lock()
            .unwrap()
            .page
            .push((locator.to_string(), node));
        self
    }

    pub fn with_redirect(self, from: &str, to: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .redirects
            .insert(from.to_string(), to.to_string());
        self
    }

    /// Dismissing the preview hides the gallery and leaves its last pane in
    /// the DOM, the way an Angular gallery toggles `display`.
    pub fn with_hiding_overlay(self) -> Self {
        self.state.lock().unwrap().hide_overlay_on_escape = true;
        self
    }

    pub fn with_responses(self, responses: Vec<(&str, Option<&str>)>) -> Self {
        self.state.lock().unwrap().responses = responses
            .into_iter()
            .map(|(url, body)| ObservedResponse {
                url: url.to_string(),
                body: body.map(String::from),
            })
            .collect();
        self
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().typed.clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().keys.clone()
    }

    pub fn scrolls(&self) -> Vec<ScrollRegion> {
        self.state.lock().unwrap().scrolls.clone()
    }

    pub fn activations(&self) -> usize {
        self.state.lock().unwrap().activations
    }

    pub fn overlapping_activations(&self) -> usize {
        self.state.lock().unwrap().overlapping_activations
    }

    /// Whether the preview is rendered.
    pub fn overlay_open(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.overlay.is_some() && !state.overlay_hidden
    }

    fn element(&self, node: FakeNode) -> Box<dyn PageElement> {
        Box::new(FakeElement {
            node: Arc::new(node),
            session: self.clone(),
        })
    }
}

fn overlay_nodes(activation: &Activation, locator: &str, hidden: bool) -> Vec<FakeNode> {
    let src = match activation {
        Activation::OpenPreview(src) => Some(src.as_str()),
        Activation::OpenEmptyPreview => None,
        _ => return Vec::new(),
    };
    let node = match locator {
        OVERLAY => FakeNode::new(),
        OVERLAY_PANE => match src {
            Some(src) => FakeNode::new().child(OVERLAY_MEDIA, FakeNode::new().attr("src", src)),
            None => FakeNode::new(),
        },
        _ => return Vec::new(),
    };
    vec![FakeNode { hidden, ..node }]
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        let mut state = self.state.lock().unwrap();
        let final_url = state
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        state.url = final_url.clone();
        Ok(NavigationResult {
            final_url,
            load_time_ms: 0,
        })
    }

    async fn wait_for_navigation(&self, _timeout_ms: u64) -> Result<()> {
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn find_all(&self, locator: &str) -> Result<Vec<Box<dyn PageElement>>> {
        let nodes: Vec<FakeNode> = {
            let state = self.state.lock().unwrap();
            if locator == ITEM {
                state.feed.items[..state.feed.visible.min(state.feed.items.len())].to_vec()
            } else if let Some(activation) = &state.overlay {
                let mut nodes = overlay_nodes(activation, locator, state.overlay_hidden);
                nodes.extend(page_matches(&state.page, locator));
                nodes
            } else {
                page_matches(&state.page, locator)
            }
        };
        Ok(nodes.into_iter().map(|n| self.element(n)).collect())
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.keys.push(key.to_string());
        if key == "Escape" {
            if state.hide_overlay_on_escape {
                state.overlay_hidden = true;
            } else {
                state.overlay = None;
            }
        }
        Ok(())
    }

    async fn scroll_to_end(&self, region: &ScrollRegion) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.scrolls.push(region.clone());
        if let Some(more) = state.feed.growth.pop_front() {
            state.feed.visible = (state.feed.visible + more).min(state.feed.items.len());
        }
        Ok(())
    }

    async fn scroll_extent(&self, _region: &ScrollRegion) -> Result<f64> {
        Ok(self.state.lock().unwrap().feed.visible as f64 * 120.0)
    }

    async fn responses(&self, _interest: EndpointMatcher) -> Result<ResponseStream> {
        let responses = self.state.lock().unwrap().responses.clone();
        Ok(futures::stream::iter(responses).boxed())
    }
}

fn page_matches(page: &[(String, FakeNode)], locator: &str) -> Vec<FakeNode> {
    page.iter()
        .filter(|(key, _)| key == locator)
        .map(|(_, node)| node.clone())
        .collect()
}

pub struct FakeElement {
    node: Arc<FakeNode>,
    session: FakeSession,
}

#[async_trait]
impl PageElement for FakeElement {
    async fn find_all(&self, locator: &str) -> Result<Vec<Box<dyn PageElement>>> {
        Ok(self
            .node
            .children
            .iter()
            .filter(|(key, _)| key == locator)
            .map(|(_, node)| self.session.element(node.clone()))
            .collect())
    }

    async fn text(&self) -> Result<String> {
        Ok(self.node.text.clone())
    }

    async fn markup(&self) -> Result<String> {
        Ok(self.node.markup.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.node.attributes.get(name).cloned())
    }

    async fn property(&self, name: &str) -> Result<Option<String>> {
        Ok(self.node.attributes.get(name).cloned())
    }

    async fn is_visible(&self) -> Result<bool> {
        Ok(!self.node.hidden)
    }

    async fn activate(&self) -> Result<()> {
        let mut state = self.session.state.lock().unwrap();
        state.activations += 1;
        if state.overlay.is_some() && !state.overlay_hidden {
            state.overlapping_activations += 1;
        }
        match &self.node.activation {
            Activation::Nothing => {}
            Activation::NavigateTo(url) => state.url = url.clone(),
            preview => {
                state.overlay = Some(preview.clone());
                state.overlay_hidden = false;
            }
        }
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        let name = self.node.attributes.get("name").cloned().unwrap_or_default();
        self.session
            .state
            .lock()
            .unwrap()
            .typed
            .push((name, text.to_string()));
        Ok(())
    }
}

/// Default config with timings that keep paused-clock tests short.
pub fn test_config() -> HarvestConfig {
    let mut config = HarvestConfig::default();
    config.feed_url = "https://school.test/feed".to_string();
    config.pagination.max_duration_ms = 20_000;
    config
}
