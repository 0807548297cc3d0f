// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Command-line arguments and how they layer over the config file.

use clap::Parser;
use feed_harvest::config::{HarvestConfig, Strategy};
use feed_harvest::login::Credentials;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "feed-harvest",
    about = "Log in, load the whole discussion feed, and save it as JSON",
    version
)]
pub struct Args {
    /// Student code; names the output file posts-<STUDENT_CODE>.json
    pub student_code: String,

    /// Path to a JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Where the data comes from: dom, network or both
    #[arg(long)]
    pub strategy: Option<Strategy>,

    /// Directory for the output file
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Pagination budget in milliseconds
    #[arg(long)]
    pub max_duration_ms: Option<u64>,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Login user name
    #[arg(long, env = "HARVEST_USERNAME")]
    pub username: String,

    /// Login password
    #[arg(long, env = "HARVEST_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Institution code entered on the login form
    #[arg(long, env = "HARVEST_CODE")]
    pub code: String,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

impl Args {
    /// Flags given on the command line win over the config file.
    pub fn apply_overrides(&self, config: &mut HarvestConfig) {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(max) = self.max_duration_ms {
            config.pagination.max_duration_ms = max;
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
            code: self.code.clone(),
        }
    }
}
