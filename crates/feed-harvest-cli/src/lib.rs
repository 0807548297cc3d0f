// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Pieces of the `feed-harvest` binary that are worth testing on their own.

pub mod args;
pub mod logging;
pub mod output;
