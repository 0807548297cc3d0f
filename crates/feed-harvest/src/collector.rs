// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Passive capture of the backend responses that back the feed.
//!
//! The collector owns a private, append-only buffer inside its own task. The
//! driver never touches it while the run is in progress; [`ResponseCollector::stop`]
//! detaches the observer and hands the buffer back.

use crate::session::{BrowserSession, ObservedResponse, ResponseStream};
use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Decides which response URLs belong to the target endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMatcher {
    pattern: String,
}

impl EndpointMatcher {
    /// Match URLs containing `pattern`. An empty pattern matches everything.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        url.contains(&self.pattern)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// One captured, parsed response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedResponse {
    /// Position in arrival order among captured responses.
    pub order: usize,
    pub url: String,
    pub payload: serde_json::Value,
    pub captured_at: DateTime<Utc>,
}

/// What a collector gathered over its lifetime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedResponses {
    pub responses: Vec<CapturedResponse>,
    /// Matching responses whose body was missing or not JSON.
    pub dropped: usize,
}

impl CollectedResponses {
    fn accept(&mut self, response: ObservedResponse, matcher: &EndpointMatcher) {
        if !matcher.matches(&response.url) {
            return;
        }
        let Some(body) = response.body else {
            self.dropped += 1;
            debug!(url = %response.url, "response body unavailable, skipping");
            return;
        };
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(payload) => {
                let order = self.responses.len();
                debug!(order, url = %response.url, "captured response");
                self.responses.push(CapturedResponse {
                    order,
                    url: response.url,
                    payload,
                    captured_at: Utc::now(),
                });
            }
            Err(e) => {
                self.dropped += 1;
                debug!(url = %response.url, error = %e, "response body is not JSON, skipping");
            }
        }
    }
}

/// A running response observer.
pub struct ResponseCollector {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<CollectedResponses>,
}

impl ResponseCollector {
    /// Begin observing. Must be called before the navigation whose responses
    /// should be captured.
    pub async fn start(session: &dyn BrowserSession, matcher: EndpointMatcher) -> Result<Self> {
        let stream = session.responses(matcher.clone()).await?;
        debug!(pattern = matcher.pattern(), "response collector started");
        Ok(Self::from_stream(stream, matcher))
    }

    /// Observe an existing response stream.
    pub fn from_stream(stream: ResponseStream, matcher: EndpointMatcher) -> Self {
        let (shutdown, signal) = oneshot::channel();
        let task = tokio::spawn(collect(stream, matcher, signal));
        Self {
            shutdown: Some(shutdown),
            task,
        }
    }

    /// Detach the observer and return everything captured, in arrival order.
    pub async fn stop(mut self) -> CollectedResponses {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match (&mut self.task).await {
            Ok(collected) => collected,
            Err(e) => {
                warn!(error = %e, "response collector task failed");
                CollectedResponses::default()
            }
        }
    }
}

async fn collect(
    mut stream: ResponseStream,
    matcher: EndpointMatcher,
    mut shutdown: oneshot::Receiver<()>,
) -> CollectedResponses {
    let mut collected = CollectedResponses::default();
    let mut ended = false;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            next = stream.next() => match next {
                Some(response) => collected.accept(response, &matcher),
                None => {
                    ended = true;
                    break;
                }
            },
        }
    }

    // Keep whatever had already arrived when stop was requested.
    while !ended {
        match stream.next().now_or_never() {
            Some(Some(response)) => collected.accept(response, &matcher),
            Some(None) | None => ended = true,
        }
    }

    collected
}
