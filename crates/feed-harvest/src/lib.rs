// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Feed harvesting engine.
//!
//! Drives a lazily-rendered, paginated feed in a live browser session until
//! it stops growing, then produces normalized records from the rendered
//! items, the backend responses observed along the way, or both.
//!
//! ```no_run
//! use feed_harvest::config::HarvestConfig;
//! use feed_harvest::harvest::Harvester;
//! use feed_harvest::session::chromium::ChromiumBrowser;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let browser = ChromiumBrowser::launch(true).await?;
//! let session = browser.new_session().await?;
//! let result = Harvester::new(HarvestConfig::default())?.run(&session).await?;
//! println!("{} posts", result.items.len());
//! # Ok(())
//! # }
//! ```

pub mod attachments;
pub mod collector;
pub mod config;
pub mod error;
pub mod extraction;
pub mod harvest;
pub mod login;
pub mod pagination;
pub mod poller;
pub mod progress;
pub mod session;
pub mod wait;

pub use config::{HarvestConfig, Strategy};
pub use error::HarvestError;
pub use extraction::NormalizedPost;
pub use harvest::{HarvestResult, HarvestStats, Harvester};
