// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::Parser;
use feed_harvest::config::HarvestConfig;
use feed_harvest::login::{login, Credentials};
use feed_harvest::progress::{self, ProgressReceiver};
use feed_harvest::session::chromium::ChromiumBrowser;
use feed_harvest::{HarvestResult, Harvester};
use feed_harvest_cli::args::Args;
use feed_harvest_cli::{logging, output};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; real environment variables still apply.
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logging::init(args.verbose, args.json_logs);

    match run(&args).await {
        Ok(path) => {
            info!(path = %path.display(), "result written");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("feed-harvest: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<PathBuf> {
    output::validate_student_code(&args.student_code)?;

    let mut config =
        HarvestConfig::resolve(args.config.as_deref()).context("failed to load config")?;
    args.apply_overrides(&mut config);

    let (tx, rx) = progress::channel();
    let harvester = Harvester::new(config)?.with_progress(tx);
    let reporter = tokio::spawn(report_progress(rx));

    let browser = ChromiumBrowser::launch(!args.headful)
        .await
        .context("failed to launch browser")?;
    let outcome = harvest(&browser, &harvester, &args.credentials()).await;
    if let Err(e) = browser.close().await {
        warn!(error = %e, "browser did not shut down cleanly");
    }

    drop(harvester);
    let _ = reporter.await;

    let result = outcome?;
    output::write_result(&args.out_dir, &args.student_code, &result)
}

async fn harvest(
    browser: &ChromiumBrowser,
    harvester: &Harvester,
    credentials: &Credentials,
) -> Result<HarvestResult> {
    let session = browser.new_session().await.context("failed to open a tab")?;
    let config = harvester.config();

    let outcome = async {
        login(&session, credentials, &config.login, config.navigation_timeout_ms).await?;
        harvester.run(&session).await
    }
    .await;

    if let Err(e) = session.close().await {
        debug!(error = %e, "failed to close tab");
    }
    Ok(outcome?)
}

/// Mirror progress events into the log until the harvester goes away.
async fn report_progress(mut rx: ProgressReceiver) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => debug!(event = %json, "progress"),
                Err(e) => debug!(error = %e, "unprintable progress event"),
            },
            Err(RecvError::Lagged(missed)) => debug!(missed, "progress reporter lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
