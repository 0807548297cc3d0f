// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! The harvest coordinator: one run over an authenticated session.
//!
//! Sequence:
//! 1. start the response collector (network strategy)
//! 2. open the feed and wait for the first items (fatal if they never come)
//! 3. paginate until stable or out of budget
//! 4. extract every rendered item (DOM strategy)
//! 5. stop the collector and assemble the result
//!
//! The collector is always detached, even when the run aborts.

use crate::collector::{CapturedResponse, CollectedResponses, EndpointMatcher, ResponseCollector};
use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::extraction::{Extraction, ExtractionPipeline, NormalizedPost};
use crate::pagination::{PaginationDriver, PaginationReport};
use crate::poller::CompletionStatus;
use crate::progress::{self, HarvestEvent, ProgressSender};
use crate::session::BrowserSession;
use crate::wait::{self, DEFAULT_POLL};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Diagnostic counters for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestStats {
    pub items_processed: usize,
    pub items_skipped: usize,
    pub attachments_missed: usize,
    pub responses_captured: usize,
    pub responses_dropped: usize,
    pub pagination: CompletionStatus,
    pub pagination_rounds: u32,
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestResult {
    pub items: Vec<NormalizedPost>,
    pub captured_responses: Vec<CapturedResponse>,
    pub completed_at: DateTime<Utc>,
    pub stats: HarvestStats,
}

/// Runs harvests with one configuration.
pub struct Harvester {
    config: HarvestConfig,
    pipeline: ExtractionPipeline,
    progress: Option<ProgressSender>,
}

impl Harvester {
    pub fn new(config: HarvestConfig) -> Result<Self, HarvestError> {
        config.validate()?;
        let pipeline = ExtractionPipeline::new(&config.extraction, &config.overlay)?;
        Ok(Self {
            config,
            pipeline,
            progress: None,
        })
    }

    /// Emit [`HarvestEvent`]s on `sender` during runs.
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Harvest the feed once.
    pub async fn run(&self, session: &dyn BrowserSession) -> Result<HarvestResult, HarvestError> {
        let start = Instant::now();
        let strategy = self.config.strategy;
        info!(feed = %self.config.feed_url, %strategy, "harvest started");
        self.emit(HarvestEvent::Started {
            feed_url: self.config.feed_url.clone(),
            strategy: strategy.to_string(),
        });

        let collector = if strategy.captures_network() {
            let matcher = EndpointMatcher::new(self.config.endpoint_pattern.clone());
            Some(ResponseCollector::start(session, matcher).await?)
        } else {
            None
        };

        let outcome = self.drive(session).await;

        let collected = match collector {
            Some(collector) => {
                let collected = collector.stop().await;
                info!(
                    captured = collected.responses.len(),
                    dropped = collected.dropped,
                    "response capture stopped"
                );
                self.emit(HarvestEvent::ResponsesCaptured {
                    captured: collected.responses.len(),
                    dropped: collected.dropped,
                });
                collected
            }
            None => CollectedResponses::default(),
        };

        let (pagination, extraction) = match outcome {
            Ok(parts) => parts,
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "harvest aborted");
                self.emit(HarvestEvent::Failed {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let stats = HarvestStats {
            items_processed: extraction.posts.len(),
            items_skipped: extraction.skipped,
            attachments_missed: extraction.attachments_missed,
            responses_captured: collected.responses.len(),
            responses_dropped: collected.dropped,
            pagination: pagination.status,
            pagination_rounds: pagination.rounds,
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            items = stats.items_processed,
            skipped = stats.items_skipped,
            responses = stats.responses_captured,
            pagination = %stats.pagination,
            elapsed_ms,
            "harvest complete"
        );
        self.emit(HarvestEvent::Completed {
            items: stats.items_processed,
            elapsed_ms,
        });

        Ok(HarvestResult {
            items: extraction.posts,
            captured_responses: collected.responses,
            completed_at: Utc::now(),
            stats,
        })
    }

    /// Steps 2-4: everything that drives the page.
    async fn drive(
        &self,
        session: &dyn BrowserSession,
    ) -> Result<(PaginationReport, Extraction), HarvestError> {
        let config = &self.config;

        let opened = Instant::now();
        let nav = session
            .navigate(&config.feed_url, config.navigation_timeout_ms)
            .await
            .map_err(|e| HarvestError::Navigation {
                url: config.feed_url.clone(),
                reason: format!("{e:#}"),
            })?;
        if !config.login.login_marker.is_empty() && nav.final_url.contains(&config.login.login_marker)
        {
            return Err(HarvestError::NotAuthenticated { url: nav.final_url });
        }

        let rendered = wait::wait_for_present(
            session,
            &config.item_locator,
            Duration::from_millis(config.first_render_timeout_ms),
            DEFAULT_POLL,
        )
        .await?;
        if !rendered {
            return Err(HarvestError::FeedNeverRendered {
                locator: config.item_locator.clone(),
                timeout_ms: config.first_render_timeout_ms,
            });
        }
        self.emit(HarvestEvent::FeedRendered {
            elapsed_ms: opened.elapsed().as_millis() as u64,
        });

        let pagination = PaginationDriver::new(
            session,
            &config.item_locator,
            &config.container_locators,
            config.pagination.poll_settings(),
        )
        .load_all()
        .await?;
        self.emit(HarvestEvent::PaginationFinished {
            status: pagination.status,
            rounds: pagination.rounds,
            items_loaded: pagination.items_loaded,
        });

        let extraction = if config.strategy.scrapes_dom() {
            let items = session.find_all(&config.item_locator).await?;
            let extraction = self.pipeline.extract(session, &items).await;
            info!(
                posts = extraction.posts.len(),
                skipped = extraction.skipped,
                attachments_missed = extraction.attachments_missed,
                "items extracted"
            );
            self.emit(HarvestEvent::ItemsExtracted {
                posts: extraction.posts.len(),
                skipped: extraction.skipped,
                attachments_missed: extraction.attachments_missed,
            });
            extraction
        } else {
            Extraction::default()
        };

        Ok((pagination, extraction))
    }

    fn emit(&self, event: HarvestEvent) {
        progress::emit(self.progress.as_ref(), event);
    }
}
