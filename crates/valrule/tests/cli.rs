//! CLI Command Tests
//!
//! Runs the commands against run files written to a temporary directory.

#![cfg(feature = "cli")]

use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use valrule::ValidationSummary;
use valrule::cli::{check, details, output::OutputFormat, run};
use valrule::engine::ExpressionDetails;

// ============================================================================
// Test Helpers
// ============================================================================

const RUN_FILE: &str = r##"{
    "config": { "max_concurrency": 2 },
    "request": {
        "org_units": ["ouA"],
        "include_descendants": true,
        "periods": ["202401"],
        "as_of": "2024-01-15"
    },
    "metadata": {
        "rules": [
            {
                "id": "ruleA",
                "name": "Referrals do not exceed cases",
                "operator": "less_than_or_equal_to",
                "left": { "expression": "#{referrals}" },
                "right": { "expression": "#{cases}" },
                "period_type": "Monthly"
            }
        ],
        "groups": [{ "id": "g1", "rules": ["ruleA"] }],
        "org_units": [
            { "id": "ouA", "name": "District", "children": [{ "id": "ouB", "name": "Clinic" }] }
        ],
        "item_names": { "cases": "Cases", "referrals": "Referrals" }
    },
    "data": {
        "rows": [
            { "data_element": "cases", "period": "202401", "org_unit": "ouB",
              "category_combo": "default", "attribute_combo": "default", "value": 3 },
            { "data_element": "referrals", "period": "202401", "org_unit": "ouB",
              "category_combo": "default", "attribute_combo": "default", "value": 5 },
            { "data_element": "cases", "period": "202401", "org_unit": "ouA",
              "category_combo": "default", "attribute_combo": "default", "value": 10 },
            { "data_element": "referrals", "period": "202401", "org_unit": "ouA",
              "category_combo": "default", "attribute_combo": "default", "value": 2 }
        ]
    }
}"##;

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_run_writes_json_summary() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "run.json", RUN_FILE);
    let out = dir.path().join("out.json");

    let summary = run::run(run::RunConfig {
        file,
        format: OutputFormat::Json,
        output_file: Some(out.clone()),
    })
    .await
    .unwrap();
    assert_eq!(summary.results.len(), 1);

    let written: ValidationSummary =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let result = &written.results[0];
    assert_eq!(result.rule.as_str(), "ruleA");
    assert_eq!(result.org_unit.as_str(), "ouB");
    assert_eq!(result.left_side, 5.0);
    assert_eq!(result.right_side, 3.0);
    assert_eq!(result.day_in_period, 15);
}

#[tokio::test]
async fn test_run_table_uses_names() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "run.json", RUN_FILE);
    let out = dir.path().join("out.txt");

    run::run(run::RunConfig {
        file,
        format: OutputFormat::Table,
        output_file: Some(out.clone()),
    })
    .await
    .unwrap();

    let table = fs::read_to_string(&out).unwrap();
    assert!(table.contains("Referrals do not exceed cases"));
    assert!(table.contains("Clinic"));
}

#[tokio::test]
async fn test_details_command() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "run.json", RUN_FILE);
    let out = dir.path().join("details.json");

    details::details(details::DetailsConfig {
        file,
        rule: "ruleA".into(),
        period: "202401".into(),
        org_unit: "ouB".into(),
        attribute_combo: None,
        format: OutputFormat::Json,
        output_file: Some(out.clone()),
    })
    .await
    .unwrap();

    let written: ExpressionDetails =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written.left_side[0].name, "Referrals");
    assert_eq!(written.left_side[0].value, Some(5.0));
    assert_eq!(written.right_side[0].name, "Cases");
    assert_eq!(written.right_side[0].value, Some(3.0));
}

#[tokio::test]
async fn test_details_rejects_bad_period() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "run.json", RUN_FILE);

    let err = details::details(details::DetailsConfig {
        file,
        rule: "ruleA".into(),
        period: "2024-13".into(),
        org_unit: "ouB".into(),
        attribute_combo: None,
        format: OutputFormat::Json,
        output_file: Some(dir.path().join("unused.json")),
    })
    .await
    .unwrap_err();
    assert!(err.to_string().contains("Invalid period"));
}

#[test]
fn test_check_accepts_valid_rules() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "run.json", RUN_FILE);
    check::check(check::CheckConfig { file }).unwrap();
}

#[test]
fn test_check_reports_broken_expression_and_unknown_group_member() {
    let broken = RUN_FILE
        .replace("#{referrals}\" }", "#{referrals} +\" }")
        .replace("\"rules\": [\"ruleA\"]", "\"rules\": [\"ruleA\", \"ruleZ\"]");
    let run_file = valrule::RunFile::from_json(&broken).unwrap();
    let issues = check::find_issues(&run_file);
    let rules: Vec<&str> = issues.iter().map(|issue| issue.rule.as_str()).collect();
    assert_eq!(rules, vec!["ruleA", "ruleZ"]);
    assert!(issues[0].message.starts_with("left side"));

    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "run.json", &broken);
    assert!(check::check(check::CheckConfig { file }).is_err());
}

#[tokio::test]
async fn test_missing_file_has_context() {
    let dir = TempDir::new().unwrap();
    let err = run::run(run::RunConfig {
        file: dir.path().join("absent.json"),
        format: OutputFormat::Json,
        output_file: None,
    })
    .await
    .unwrap_err();
    assert!(err.to_string().contains("Failed to read run file"));
}
