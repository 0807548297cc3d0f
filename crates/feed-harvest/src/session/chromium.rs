// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Chromium-backed session using chromiumoxide.

use super::{
    script, BrowserSession, NavigationResult, ObservedResponse, PageElement, ResponseStream,
    ScrollRegion,
};
use crate::collector::EndpointMatcher;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventResponseReceived,
    GetResponseBodyParams, RequestId,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. HARVEST_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("HARVEST_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.feed-harvest/chromium/
    if let Some(home) = dirs::home_dir() {
        let root = home.join(".feed-harvest/chromium");
        let candidates = if cfg!(target_os = "macos") {
            vec![
                root.join("chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                root.join("chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                root.join("chrome"),
            ]
        } else {
            vec![root.join("chrome-linux64/chrome"), root.join("chrome")]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// A launched Chromium instance.
pub struct ChromiumBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumBrowser {
    /// Launch Chromium. `headless = false` opens a visible window.
    pub async fn launch(headless: bool) -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Set HARVEST_CHROMIUM_PATH or install Chrome.")?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        builder = if headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        info!(headless, "Chromium launched");
        Ok(Self { browser, handler })
    }

    /// Open a fresh tab.
    pub async fn new_session(&self) -> Result<ChromiumSession> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;
        Ok(ChromiumSession { page })
    }

    /// Close the browser and wait for the process to exit.
    pub async fn close(mut self) -> Result<()> {
        let closed = self.browser.close().await.context("failed to close Chromium");
        let _ = self.browser.wait().await;
        self.handler.abort();
        closed.map(|_| ())
    }
}

/// A single Chromium tab.
pub struct ChromiumSession {
    page: Page,
}

impl ChromiumSession {
    pub async fn close(self) -> Result<()> {
        self.page.close().await.context("failed to close page")
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;
        result
            .into_value()
            .map_err(|e| anyhow!("failed to convert JS result: {e:?}"))
    }
}

fn wrap(elements: Vec<Element>) -> Vec<Box<dyn PageElement>> {
    elements
        .into_iter()
        .map(|element| Box::new(ChromiumElement { element }) as Box<dyn PageElement>)
        .collect()
}

/// Windows virtual key code for the keys the harvester presses.
fn virtual_key_code(key: &str) -> Option<i64> {
    match key {
        "Escape" => Some(27),
        "Enter" => Some(13),
        "Tab" => Some(9),
        _ => None,
    }
}

fn key_event(kind: DispatchKeyEventType, key: &str) -> Result<DispatchKeyEventParams> {
    let mut builder = DispatchKeyEventParams::builder()
        .r#type(kind)
        .key(key)
        .code(key);
    if let Some(code) = virtual_key_code(key) {
        builder = builder.windows_virtual_key_code(code);
    }
    builder
        .build()
        .map_err(|e| anyhow!("failed to build key event: {e}"))
}

fn decode_body(body: String, base64_encoded: bool) -> Option<String> {
    if !base64_encoded {
        return Some(body);
    }
    let bytes = base64::engine::general_purpose::STANDARD.decode(body).ok()?;
    String::from_utf8(bytes).ok()
}

/// Run `goto` and then `settle` under one shared deadline.
async fn load_within<G, S, E>(timeout_ms: u64, goto: G, settle: S) -> Result<()>
where
    G: Future<Output = std::result::Result<(), E>>,
    S: Future<Output = ()>,
    E: std::fmt::Display,
{
    let load = async {
        goto.await?;
        settle.await;
        Ok::<(), E>(())
    };
    match tokio::time::timeout(Duration::from_millis(timeout_ms), load).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => bail!("navigation failed: {e}"),
        Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
    }
}

/// Tracks matching requests from response headers to load completion.
///
/// Bodies are only complete once loading finishes, so the URL is remembered
/// when the response arrives and handed back when the load ends. `H` is
/// whatever handle the body fetch needs.
struct ResponseTracker<H> {
    interest: EndpointMatcher,
    pending: HashMap<String, (H, String)>,
}

impl<H> ResponseTracker<H> {
    fn new(interest: EndpointMatcher) -> Self {
        Self {
            interest,
            pending: HashMap::new(),
        }
    }

    /// Remember a response if its URL is interesting.
    fn received(&mut self, request_id: &str, handle: H, url: &str) {
        if self.interest.matches(url) {
            self.pending
                .insert(request_id.to_string(), (handle, url.to_string()));
        }
    }

    /// A tracked load finished; its body can now be fetched.
    fn finished(&mut self, request_id: &str) -> Option<(H, String)> {
        self.pending.remove(request_id)
    }

    /// A tracked load failed; it is reported without a body.
    fn failed(&mut self, request_id: &str) -> Option<ObservedResponse> {
        self.pending
            .remove(request_id)
            .map(|(_, url)| ObservedResponse { url, body: None })
    }

    fn in_flight(&self) -> usize {
        self.pending.len()
    }
}

/// A stream fed by a background task. Dropping it stops the task.
struct TaskStream<S> {
    inner: S,
    task: JoinHandle<()>,
}

impl<S: Stream + Unpin> Stream for TaskStream<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<S::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl<S> Drop for TaskStream<S> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        load_within(
            timeout_ms,
            async { self.page.goto(url).await.map(|_| ()) },
            async {
                // client-side redirects may still be in flight after goto
                let _ = self.page.wait_for_navigation().await;
            },
        )
        .await?;

        let final_url = self.current_url().await.unwrap_or_else(|_| url.to_string());
        Ok(NavigationResult {
            final_url,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn wait_for_navigation(&self, timeout_ms: u64) -> Result<()> {
        tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.page.wait_for_navigation(),
        )
        .await
        .map_err(|_| anyhow!("navigation did not settle within {timeout_ms}ms"))?
        .context("navigation failed")?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn find_all(&self, locator: &str) -> Result<Vec<Box<dyn PageElement>>> {
        let elements = self
            .page
            .find_elements(locator)
            .await
            .with_context(|| format!("query failed: `{locator}`"))?;
        Ok(wrap(elements))
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.page
            .execute(key_event(DispatchKeyEventType::KeyDown, key)?)
            .await
            .with_context(|| format!("failed to press {key}"))?;
        self.page
            .execute(key_event(DispatchKeyEventType::KeyUp, key)?)
            .await
            .with_context(|| format!("failed to release {key}"))?;
        Ok(())
    }

    async fn scroll_to_end(&self, region: &ScrollRegion) -> Result<()> {
        let found: bool = self.evaluate(&script::scroll_to_end(region)).await?;
        if !found {
            debug!(%region, "scroll region not present");
        }
        Ok(())
    }

    async fn scroll_extent(&self, region: &ScrollRegion) -> Result<f64> {
        self.evaluate(&script::scroll_extent(region)).await
    }

    async fn responses(&self, interest: EndpointMatcher) -> Result<ResponseStream> {
        self.page
            .execute(EnableParams::default())
            .await
            .context("failed to enable network events")?;

        let mut received = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .context("failed to subscribe to responses")?;
        let mut finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await
            .context("failed to subscribe to finished loads")?;
        let mut failed = self
            .page
            .event_listener::<EventLoadingFailed>()
            .await
            .context("failed to subscribe to failed loads")?;

        let page = self.page.clone();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let mut tracker: ResponseTracker<RequestId> = ResponseTracker::new(interest);
            loop {
                tokio::select! {
                    Some(event) = received.next() => {
                        tracker.received(
                            event.request_id.inner(),
                            event.request_id.clone(),
                            &event.response.url,
                        );
                    }
                    Some(event) = finished.next() => {
                        let Some((request_id, url)) = tracker.finished(event.request_id.inner()) else {
                            continue;
                        };
                        let body = match page.execute(GetResponseBodyParams::new(request_id)).await {
                            Ok(response) => {
                                let returns = response.result;
                                decode_body(returns.body, returns.base64_encoded)
                            }
                            Err(e) => {
                                debug!(%url, error = %e, "response body unavailable");
                                None
                            }
                        };
                        if tx.send(ObservedResponse { url, body }).is_err() {
                            break;
                        }
                    }
                    Some(event) = failed.next() => {
                        if let Some(response) = tracker.failed(event.request_id.inner()) {
                            if tx.send(response).is_err() {
                                break;
                            }
                        }
                    }
                    else => break,
                }
            }
            debug!(in_flight = tracker.in_flight(), "response forwarder stopped");
        });

        Ok(Box::pin(TaskStream {
            inner: UnboundedReceiverStream::new(rx),
            task,
        }))
    }
}

/// A DOM element inside a Chromium page.
pub struct ChromiumElement {
    element: Element,
}

#[async_trait]
impl PageElement for ChromiumElement {
    async fn find_all(&self, locator: &str) -> Result<Vec<Box<dyn PageElement>>> {
        let elements = self
            .element
            .find_elements(locator)
            .await
            .with_context(|| format!("query failed: `{locator}`"))?;
        Ok(wrap(elements))
    }

    async fn text(&self) -> Result<String> {
        Ok(self
            .element
            .inner_text()
            .await
            .context("failed to read text")?
            .unwrap_or_default())
    }

    async fn markup(&self) -> Result<String> {
        Ok(self
            .element
            .inner_html()
            .await
            .context("failed to read markup")?
            .unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.element
            .attribute(name)
            .await
            .with_context(|| format!("failed to read attribute {name}"))
    }

    async fn property(&self, name: &str) -> Result<Option<String>> {
        let value = self
            .element
            .property(name)
            .await
            .with_context(|| format!("failed to read property {name}"))?;
        Ok(value.and_then(|v| match v {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }))
    }

    async fn is_visible(&self) -> Result<bool> {
        let returns = self
            .element
            .call_js_fn(script::IS_VISIBLE_FN, false)
            .await
            .context("failed to check visibility")?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn activate(&self) -> Result<()> {
        self.element.click().await.context("click failed")?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.element.click().await.context("failed to focus input")?;
        self.element
            .type_str(text)
            .await
            .context("failed to type into input")?;
        Ok(())
    }
}
