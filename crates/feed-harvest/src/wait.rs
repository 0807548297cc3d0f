// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Bounded waits for elements to appear, show, or hide.
//!
//! Elapsing the bound is reported as `false`, never as an error; the caller
//! decides whether that is fatal.

use crate::session::{BrowserSession, PageElement};
use anyhow::Result;
use std::time::Duration;
use tokio::time::Instant;

/// Poll interval used by the harvester's waits.
pub const DEFAULT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    /// Something matches.
    Present,
    /// Some match is rendered.
    Visible,
    /// No match is rendered; hidden matches may remain in the DOM.
    Hidden,
}

/// Wait until something matches `locator`.
pub async fn wait_for_present(
    session: &dyn BrowserSession,
    locator: &str,
    timeout: Duration,
    poll: Duration,
) -> Result<bool> {
    wait_until(session, locator, timeout, poll, Condition::Present).await
}

/// Wait until a match of `locator` is rendered.
pub async fn wait_for_visible(
    session: &dyn BrowserSession,
    locator: &str,
    timeout: Duration,
    poll: Duration,
) -> Result<bool> {
    wait_until(session, locator, timeout, poll, Condition::Visible).await
}

/// Wait until no match of `locator` is rendered.
pub async fn wait_for_hidden(
    session: &dyn BrowserSession,
    locator: &str,
    timeout: Duration,
    poll: Duration,
) -> Result<bool> {
    wait_until(session, locator, timeout, poll, Condition::Hidden).await
}

/// The first rendered element matching `locator`.
pub async fn find_visible(
    session: &dyn BrowserSession,
    locator: &str,
) -> Result<Option<Box<dyn PageElement>>> {
    for element in session.find_all(locator).await? {
        if element.is_visible().await? {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

async fn satisfied(
    session: &dyn BrowserSession,
    locator: &str,
    condition: Condition,
) -> Result<bool> {
    Ok(match condition {
        Condition::Present => session.find(locator).await?.is_some(),
        Condition::Visible => find_visible(session, locator).await?.is_some(),
        Condition::Hidden => find_visible(session, locator).await?.is_none(),
    })
}

async fn wait_until(
    session: &dyn BrowserSession,
    locator: &str,
    timeout: Duration,
    poll: Duration,
    condition: Condition,
) -> Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        if satisfied(session, locator, condition).await? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(poll).await;
    }
}
