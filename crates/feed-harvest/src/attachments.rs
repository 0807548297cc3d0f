// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Attachment resolution for a single feed item.
//!
//! Cards with inline media are read directly. Every other card is opened in
//! the shared preview overlay, read, and dismissed before the next card is
//! touched; one overlay is open at a time. Open and closed mean rendered and
//! not rendered: the gallery may stay in the DOM while hidden. A card whose preview never opens
//! yields no URL and does not stop the remaining cards.

use crate::config::{ExtractionConfig, OverlayConfig};
use crate::session::{BrowserSession, PageElement};
use crate::wait::{self, DEFAULT_POLL};
use anyhow::Result;
use std::time::Duration;
use tracing::{debug, warn};

/// Attachments resolved for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAttachments {
    /// URLs in card encounter order.
    pub urls: Vec<String>,
    /// Cards that produced no URL.
    pub missed: usize,
}

pub struct AttachmentResolver {
    card_locator: String,
    inline_media_locator: String,
    overlay: OverlayConfig,
    poll: Duration,
}

impl AttachmentResolver {
    pub fn new(extraction: &ExtractionConfig, overlay: &OverlayConfig) -> Self {
        Self {
            card_locator: extraction.attachment_card_locator.clone(),
            inline_media_locator: extraction.inline_media_locator.clone(),
            overlay: overlay.clone(),
            poll: DEFAULT_POLL,
        }
    }

    /// Resolve every attachment card of `item`, strictly one after another.
    pub async fn resolve(
        &self,
        session: &dyn BrowserSession,
        item: &dyn PageElement,
    ) -> ResolvedAttachments {
        let mut resolved = ResolvedAttachments::default();

        let cards = match item.find_all(&self.card_locator).await {
            Ok(cards) => cards,
            Err(e) => {
                warn!(error = %e, "could not list attachment cards");
                return resolved;
            }
        };

        for (index, card) in cards.iter().enumerate() {
            match self.resolve_card(session, card.as_ref()).await {
                Ok(Some(url)) => {
                    debug!(card = index, %url, "attachment resolved");
                    resolved.urls.push(url);
                }
                Ok(None) => resolved.missed += 1,
                Err(e) => {
                    warn!(card = index, error = %e, "attachment card failed");
                    resolved.missed += 1;
                    self.dismiss_overlay(session).await;
                }
            }
        }

        resolved
    }

    async fn resolve_card(
        &self,
        session: &dyn BrowserSession,
        card: &dyn PageElement,
    ) -> Result<Option<String>> {
        if let Some(media) = card.find(&self.inline_media_locator).await? {
            return media_source(media.as_ref()).await;
        }

        card.activate().await?;
        let opened = wait::wait_for_visible(
            session,
            &self.overlay.locator,
            Duration::from_millis(self.overlay.appear_timeout_ms),
            self.poll,
        )
        .await?;

        let url = if opened {
            let url = self.read_overlay(session).await?;
            if url.is_none() {
                debug!("preview opened without a media reference");
            }
            url
        } else {
            warn!(
                timeout_ms = self.overlay.appear_timeout_ms,
                "preview overlay never appeared, skipping attachment"
            );
            None
        };

        self.dismiss_overlay(session).await;
        Ok(url)
    }

    async fn read_overlay(&self, session: &dyn BrowserSession) -> Result<Option<String>> {
        // a hidden gallery keeps the previous card's pane in the DOM
        let Some(pane) = wait::find_visible(session, &self.overlay.content_locator).await? else {
            return Ok(None);
        };
        let Some(media) = pane.find(&self.overlay.media_locator).await? else {
            return Ok(None);
        };
        media_source(media.as_ref()).await
    }

    /// Close the preview and wait until it is no longer rendered. Failures
    /// are logged: the next card still gets its turn.
    async fn dismiss_overlay(&self, session: &dyn BrowserSession) {
        if let Err(e) = session.press_key(&self.overlay.dismiss_key).await {
            warn!(error = %e, "failed to dismiss preview overlay");
            return;
        }
        match wait::wait_for_hidden(
            session,
            &self.overlay.locator,
            Duration::from_millis(self.overlay.dismiss_timeout_ms),
            self.poll,
        )
        .await
        {
            Ok(true) => {}
            Ok(false) => warn!(
                timeout_ms = self.overlay.dismiss_timeout_ms,
                "preview overlay still visible after dismissal"
            ),
            Err(e) => warn!(error = %e, "failed waiting for preview overlay to close"),
        }
    }
}

/// The resolved `src` property, falling back to the raw attribute.
async fn media_source(media: &dyn PageElement) -> Result<Option<String>> {
    let src = match media.property("src").await? {
        Some(src) if !src.trim().is_empty() => Some(src),
        _ => media.attribute("src").await?,
    };
    Ok(src
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}
