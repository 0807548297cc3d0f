// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Form login that turns a fresh session into an authenticated one.

use crate::config::LoginConfig;
use crate::error::HarvestError;
use crate::session::BrowserSession;
use tracing::{info, warn};

/// Login credentials. The password is never printed.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Institution code.
    pub code: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("code", &self.code)
            .finish()
    }
}

/// Fill and submit the login form, then require the post-login URL.
pub async fn login(
    session: &dyn BrowserSession,
    credentials: &Credentials,
    config: &LoginConfig,
    timeout_ms: u64,
) -> Result<(), HarvestError> {
    info!(username = %credentials.username, url = %config.url, "logging in");

    session
        .navigate(&config.url, timeout_ms)
        .await
        .map_err(|e| HarvestError::Navigation {
            url: config.url.clone(),
            reason: format!("{e:#}"),
        })?;

    let fields = [
        (&config.username_locator, &credentials.username),
        (&config.password_locator, &credentials.password),
        (&config.code_locator, &credentials.code),
    ];
    for (locator, value) in fields {
        let field = session
            .find(locator)
            .await?
            .ok_or_else(|| HarvestError::LoginFormMissing {
                locator: locator.clone(),
            })?;
        field.type_text(value).await?;
    }

    let submit = session
        .find(&config.submit_locator)
        .await?
        .ok_or_else(|| HarvestError::LoginFormMissing {
            locator: config.submit_locator.clone(),
        })?;
    submit.activate().await?;

    // The redirect may already be over; the URL check below is what counts.
    if let Err(e) = session.wait_for_navigation(timeout_ms).await {
        warn!(error = %e, "no navigation observed after submitting login");
    }

    let url = session.current_url().await?;
    if !url.contains(&config.success_marker) {
        return Err(HarvestError::NotAuthenticated { url });
    }

    info!("logged in");
    Ok(())
}
