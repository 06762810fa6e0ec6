//! Details command implementation

use super::{load_run_file, output};
use anyhow::{Context, Result};
use std::path::PathBuf;
use valrule_engine::ExpressionDetails;
use valrule_model::{AttributeComboId, OrgUnitId, Period, RuleId};

/// Configuration for the details command
pub struct DetailsConfig {
    pub file: PathBuf,
    pub rule: String,
    pub period: String,
    pub org_unit: String,
    pub attribute_combo: Option<String>,
    pub format: output::OutputFormat,
    pub output_file: Option<PathBuf>,
}

/// Print the operand values behind one rule instance
pub async fn details(config: DetailsConfig) -> Result<ExpressionDetails> {
    let run_file = load_run_file(&config.file)?;
    let context = run_file
        .context()
        .with_context(|| format!("Invalid request in {}", config.file.display()))?;
    let period = Period::parse(&config.period)
        .with_context(|| format!("Invalid period: {}", config.period))?;
    let attribute_combo = config.attribute_combo.as_deref().map(AttributeComboId::from);

    let details = run_file
        .runner()
        .expression_details(
            &context,
            &RuleId::from(config.rule.as_str()),
            period,
            &OrgUnitId::from(config.org_unit.as_str()),
            attribute_combo.as_ref(),
        )
        .await
        .with_context(|| format!("Failed to resolve details for rule {}", config.rule))?;

    let rendered = output::format_details(&details, config.format)?;
    output::write_output(&rendered, config.output_file.as_deref())?;
    Ok(details)
}
