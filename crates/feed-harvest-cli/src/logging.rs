// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Tracing subscriber setup. Logs go to stderr; stdout stays clean.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "feed_harvest=debug,feed_harvest_cli=debug"
    } else {
        "feed_harvest=info,feed_harvest_cli=info"
    }
}

pub fn init(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
