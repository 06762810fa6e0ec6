//! CLI functionality for the valrule tool
//!
//! - `run`: evaluate a run file and report violations
//! - `details`: operand values behind one rule instance
//! - `check`: parse every rule expression without touching data
//! - Logging setup and output formatting

pub mod check;
pub mod details;
pub mod logging;
pub mod output;
pub mod run;

use crate::RunFile;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read and parse a run file
pub fn load_run_file(path: &Path) -> Result<RunFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read run file: {}", path.display()))?;
    RunFile::from_json(&text)
        .with_context(|| format!("Failed to parse run file: {}", path.display()))
}
