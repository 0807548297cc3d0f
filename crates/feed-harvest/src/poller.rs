// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Stability polling: keep nudging, watch a measurement, stop when it
//! settles.
//!
//! The poller knows nothing about browsers. `nudge` advances loading (a
//! scroll, usually) and `measure` reports how much is loaded. A run is
//! [`CompletionStatus::Converged`] once the measurement has been unchanged
//! for `stable_rounds` consecutive rounds, and
//! [`CompletionStatus::TimedOut`] if `max_duration` elapses first. Timing
//! out is a weaker completion signal, not an error.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// How a stability poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Converged,
    TimedOut,
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Converged => write!(f, "converged"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait between a nudge and the following measurement.
    pub interval: Duration,
    /// Consecutive unchanged measurements required to converge.
    pub stable_rounds: u32,
    /// Overall budget.
    pub max_duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollOutcome {
    pub status: CompletionStatus,
    /// Number of nudge/measure rounds performed.
    pub rounds: u32,
    /// The last value `measure` returned (0 if it never ran).
    pub last_measure: f64,
    pub elapsed: Duration,
}

/// Nudge and measure until the measurement is stable or the budget runs out.
///
/// The first measurement never counts as stable; any change resets the
/// counter. Errors from `measure` or `nudge` are propagated unchanged.
pub async fn observe<M, MF, N, NF>(
    mut measure: M,
    mut nudge: N,
    settings: &PollSettings,
) -> Result<PollOutcome>
where
    M: FnMut() -> MF,
    MF: Future<Output = Result<f64>>,
    N: FnMut() -> NF,
    NF: Future<Output = Result<()>>,
{
    let start = Instant::now();
    let mut previous: Option<f64> = None;
    let mut stable = 0u32;
    let mut rounds = 0u32;
    let mut last_measure = 0.0;

    while start.elapsed() < settings.max_duration {
        nudge().await?;
        tokio::time::sleep(settings.interval).await;
        let current = measure().await?;
        rounds += 1;
        last_measure = current;

        if previous == Some(current) {
            stable += 1;
            if stable >= settings.stable_rounds {
                return Ok(PollOutcome {
                    status: CompletionStatus::Converged,
                    rounds,
                    last_measure,
                    elapsed: start.elapsed(),
                });
            }
        } else {
            stable = 0;
            previous = Some(current);
        }
    }

    Ok(PollOutcome {
        status: CompletionStatus::TimedOut,
        rounds,
        last_measure,
        elapsed: start.elapsed(),
    })
}
