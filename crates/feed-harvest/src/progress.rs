// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Progress events and broadcast channel for harvest telemetry.
//!
//! The coordinator emits `HarvestEvent`s at phase boundaries. They flow
//! through a `tokio::sync::broadcast` channel to whoever subscribed; with no
//! subscriber they are silently dropped.

use crate::poller::CompletionStatus;
use serde::{Deserialize, Serialize};

/// A phase-level event from one harvest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HarvestEvent {
    /// The run started.
    Started { feed_url: String, strategy: String },
    /// The first batch of feed items is on screen.
    FeedRendered { elapsed_ms: u64 },
    /// Pagination finished (converged or ran out of budget).
    PaginationFinished {
        status: CompletionStatus,
        rounds: u32,
        items_loaded: usize,
    },
    /// DOM extraction finished.
    ItemsExtracted {
        posts: usize,
        skipped: usize,
        attachments_missed: usize,
    },
    /// Network capture stopped.
    ResponsesCaptured { captured: usize, dropped: usize },
    /// The run finished successfully.
    Completed { items: usize, elapsed_ms: u64 },
    /// The run aborted.
    Failed { kind: String, message: String },
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<HarvestEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<HarvestEvent>;

/// Create a new progress channel. A run emits fewer than ten events.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(64)
}

/// Emit an event if anyone may be listening; send errors are ignored.
pub fn emit(sender: Option<&ProgressSender>, event: HarvestEvent) {
    if let Some(tx) = sender {
        let _ = tx.send(event);
    }
}
