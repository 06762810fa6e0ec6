//! Run command implementation

use super::{load_run_file, output};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;
use valrule_engine::ValidationSummary;

/// Configuration for the run command
pub struct RunConfig {
    pub file: PathBuf,
    pub format: output::OutputFormat,
    pub output_file: Option<PathBuf>,
}

/// Evaluate a run file and print its violations
pub async fn run(config: RunConfig) -> Result<ValidationSummary> {
    let run_file = load_run_file(&config.file)?;
    let context = run_file
        .context()
        .with_context(|| format!("Invalid request in {}", config.file.display()))?;
    info!(file = %config.file.display(), "running validation");

    let summary = run_file
        .runner()
        .run(&context)
        .await
        .context("Validation run failed")?;

    let rendered = output::format_summary(&summary, &run_file.metadata, config.format)?;
    output::write_output(&rendered, config.output_file.as_deref())?;
    for warning in output::summary_warnings(&summary) {
        eprintln!("{}", output::format_warning(&warning));
    }
    Ok(summary)
}
