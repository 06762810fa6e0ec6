//! Check command implementation

use super::{load_run_file, output};
use crate::RunFile;
use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;
use valrule_expr::{ExpressionEngine, ExpressionService};

/// Configuration for the check command
pub struct CheckConfig {
    pub file: PathBuf,
}

/// A rule definition problem found without evaluating any data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleIssue {
    pub rule: String,
    pub message: String,
}

/// Parse every rule expression and resolve every group member
pub fn find_issues(run_file: &RunFile) -> Vec<RuleIssue> {
    let engine = ExpressionEngine::new();
    let mut issues = Vec::new();
    for rule in &run_file.metadata.rules {
        for (side, expression) in [("left", &rule.left), ("right", &rule.right)] {
            if let Err(err) = engine.validate(&expression.expression) {
                issues.push(RuleIssue {
                    rule: rule.id.to_string(),
                    message: format!("{side} side: {err}"),
                });
            }
        }
    }
    for group in &run_file.metadata.groups {
        for id in &group.rules {
            if run_file.metadata.rule(id).is_none() {
                issues.push(RuleIssue {
                    rule: id.to_string(),
                    message: format!("listed in group {} but not defined", group.id),
                });
            }
        }
    }
    issues
}

/// Check a run file's rules; fails when any issue is found
pub fn check(config: CheckConfig) -> Result<()> {
    let run_file = load_run_file(&config.file)?;
    let issues = find_issues(&run_file);
    if issues.is_empty() {
        eprintln!(
            "{}",
            output::format_success(&format!(
                "{} rules checked in {}",
                run_file.metadata.rules.len(),
                config.file.display()
            ))
        );
        return Ok(());
    }
    for issue in &issues {
        eprintln!("{} {}", issue.rule.cyan(), issue.message);
    }
    anyhow::bail!("{} problems found in {}", issues.len(), config.file.display())
}
