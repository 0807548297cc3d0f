// Copyright 2026 Feed Harvest Contributors
// SPDX-License-Identifier: MIT

//! Result file naming and writing.

use anyhow::{bail, Context, Result};
use feed_harvest::HarvestResult;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// `<dir>/posts-<student_code>.json`
pub fn output_path(dir: &Path, student_code: &str) -> PathBuf {
    dir.join(format!("posts-{student_code}.json"))
}

/// The student code ends up in a file name, so it must be a plain token.
pub fn validate_student_code(code: &str) -> Result<()> {
    if code.trim().is_empty() {
        bail!("student code must not be empty");
    }
    if code.contains(['/', '\\']) || code == "." || code == ".." {
        bail!("student code {code:?} is not usable as a file name");
    }
    Ok(())
}

/// Write `result` as pretty JSON. The file appears complete or not at all.
pub fn write_result(dir: &Path, student_code: &str, result: &HarvestResult) -> Result<PathBuf> {
    validate_student_code(student_code)?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let path = output_path(dir, student_code);
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, result).context("failed to serialize result")?;
    tmp.write_all(b"\n")?;
    tmp.persist(&path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(path)
}
