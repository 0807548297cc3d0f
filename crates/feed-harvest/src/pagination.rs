// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Drive lazy loading until the feed stops growing.

use crate::poller::{self, CompletionStatus, PollSettings};
use crate::session::{BrowserSession, ScrollRegion};
use anyhow::Result;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How pagination ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationReport {
    pub status: CompletionStatus,
    pub rounds: u32,
    /// Rendered items when polling stopped.
    pub items_loaded: usize,
    pub region: ScrollRegion,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Scrolls the feed until no new items appear.
pub struct PaginationDriver<'a> {
    session: &'a dyn BrowserSession,
    item_locator: &'a str,
    container_locators: &'a [String],
    settings: PollSettings,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(
        session: &'a dyn BrowserSession,
        item_locator: &'a str,
        container_locators: &'a [String],
        settings: PollSettings,
    ) -> Self {
        Self {
            session,
            item_locator,
            container_locators,
            settings,
        }
    }

    /// Pick the scrollable region: the first container candidate that
    /// exists, else the parent of the first item, else the viewport.
    pub async fn resolve_region(&self) -> Result<ScrollRegion> {
        for locator in self.container_locators {
            if self.session.find(locator).await?.is_some() {
                return Ok(ScrollRegion::Container(locator.clone()));
            }
        }
        if self.session.find(self.item_locator).await?.is_some() {
            return Ok(ScrollRegion::ItemParent(self.item_locator.to_string()));
        }
        Ok(ScrollRegion::Viewport)
    }

    /// Scroll until the item count is stable or the budget runs out.
    ///
    /// Both outcomes are usable; a timeout is logged because the feed may be
    /// incomplete.
    pub async fn load_all(&self) -> Result<PaginationReport> {
        let region = self.resolve_region().await?;
        debug!(%region, "scroll region resolved");

        let session = self.session;
        let item_locator = self.item_locator;
        let outcome = poller::observe(
            || measure(session, item_locator, &region),
            || session.scroll_to_end(&region),
            &self.settings,
        )
        .await?;

        let items_loaded = session.find_all(item_locator).await?.len();
        match outcome.status {
            CompletionStatus::Converged => info!(
                items = items_loaded,
                rounds = outcome.rounds,
                "feed fully loaded"
            ),
            CompletionStatus::TimedOut => warn!(
                items = items_loaded,
                rounds = outcome.rounds,
                budget_ms = self.settings.max_duration.as_millis() as u64,
                "feed still growing when the pagination budget ran out, data may be incomplete"
            ),
        }

        Ok(PaginationReport {
            status: outcome.status,
            rounds: outcome.rounds,
            items_loaded,
            region,
            elapsed: outcome.elapsed,
        })
    }
}

/// Rendered item count, or the region's height before anything is countable.
async fn measure(
    session: &dyn BrowserSession,
    item_locator: &str,
    region: &ScrollRegion,
) -> Result<f64> {
    let count = session.find_all(item_locator).await?.len();
    if count > 0 {
        return Ok(count as f64);
    }
    session.scroll_extent(region).await
}
