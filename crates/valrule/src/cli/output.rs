//! Output formatting utilities

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;
use tabled::{Table, Tabled, settings::Style};
use valrule_engine::{ExpressionDetails, Metadata, ValidationSummary};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Pretty,
    Table,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Set up color output based on user preference
pub fn setup_colors(mode: ColorMode) {
    let enabled = match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal(),
    };
    colored::control::set_override(enabled);
}

pub fn format_error(error: &anyhow::Error) -> String {
    format!("{} {:#}", "Error:".red().bold(), error)
}

pub fn format_warning(warning: &str) -> String {
    format!("{} {}", "Warning:".yellow().bold(), warning)
}

pub fn format_success(message: &str) -> String {
    format!("{} {}", "Success:".green().bold(), message)
}

/// Write output to a file or stdout
pub fn write_output(content: &str, output_file: Option<&Path>) -> Result<()> {
    match output_file {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            eprintln!(
                "{}",
                format_success(&format!("Output written to {}", path.display()))
            );
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(value).context("Failed to serialize JSON")
    } else {
        serde_json::to_string(value).context("Failed to serialize JSON")
    }
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Rule")]
    rule: String,
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Org unit")]
    org_unit: String,
    #[tabled(rename = "Attribute combo")]
    attribute_combo: String,
    #[tabled(rename = "Left")]
    left: f64,
    #[tabled(rename = "Right")]
    right: f64,
    #[tabled(rename = "Day")]
    day_in_period: u32,
}

#[derive(Tabled)]
struct DetailRow {
    #[tabled(rename = "Side")]
    side: &'static str,
    #[tabled(rename = "Item")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Render a run summary; rule names come from `metadata`
pub fn format_summary(
    summary: &ValidationSummary,
    metadata: &Metadata,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(summary, false),
        OutputFormat::Pretty => to_json(summary, true),
        OutputFormat::Table => {
            if summary.results.is_empty() {
                return Ok("(no violations)".to_string());
            }
            let rows = summary.results.iter().map(|result| ResultRow {
                rule: metadata
                    .rule(&result.rule)
                    .map_or_else(|| result.rule.to_string(), |rule| rule.name.clone()),
                period: result.period.to_string(),
                org_unit: metadata
                    .org_unit(&result.org_unit)
                    .map_or_else(|| result.org_unit.to_string(), |unit| {
                        unit.display_name().to_string()
                    }),
                attribute_combo: result.attribute_combo.to_string(),
                left: result.left_side,
                right: result.right_side,
                day_in_period: result.day_in_period,
            });
            Ok(Table::new(rows).with(Style::modern()).to_string())
        }
    }
}

/// One line per problem worth surfacing on stderr
pub fn summary_warnings(summary: &ValidationSummary) -> Vec<String> {
    let mut warnings = Vec::new();
    if summary.truncated {
        warnings.push(format!(
            "result limit reached after {} violations; more may exist",
            summary.results.len()
        ));
    }
    if summary.cancelled {
        warnings.push("run cancelled before every org unit was evaluated".to_string());
    }
    for failure in &summary.failed_units {
        warnings.push(format!(
            "org unit {} skipped: {}",
            failure.org_unit, failure.message
        ));
    }
    warnings
}

pub fn format_details(details: &ExpressionDetails, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(details, false),
        OutputFormat::Pretty => to_json(details, true),
        OutputFormat::Table => {
            let side = |label: &'static str, entries: &[valrule_engine::DetailEntry]| {
                entries
                    .iter()
                    .map(move |entry| DetailRow {
                        side: label,
                        name: entry.name.clone(),
                        value: entry
                            .value
                            .map_or_else(|| "-".to_string(), |value| value.to_string()),
                    })
                    .collect::<Vec<_>>()
            };
            let mut rows = side("left", &details.left_side);
            rows.extend(side("right", &details.right_side));
            Ok(Table::new(rows).with(Style::modern()).to_string())
        }
    }
}
