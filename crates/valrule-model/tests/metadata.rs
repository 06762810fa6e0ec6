//! Metadata Deserialization Tests
//!
//! Exercises the model the way a run file supplies it:
//! - Rules with expressions and strategies
//! - Org unit trees with implicit levels
//! - Data rows keyed by ISO periods

use pretty_assertions::assert_eq;
use valrule_model::{
    DataRow, MissingValueStrategy, Operator, OrgUnit, OrgUnitId, Period, PeriodType,
    ValidationRule,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn period(id: &str) -> Period {
    Period::parse(id).unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_rule_list_from_json() {
    let json = r##"[
        {
            "id": "ruleA",
            "name": "A plus B equals C minus D",
            "operator": "equal_to",
            "left": { "expression": "#{deA} + #{deB}" },
            "right": { "expression": "#{deC} - #{deD}" },
            "period_type": "Monthly"
        },
        {
            "id": "ruleP",
            "operator": "equal_to",
            "left": { "expression": "#{deA}", "missing_value_strategy": "SKIP_IF_ANY_VALUE_MISSING" },
            "right": { "expression": "[days]" },
            "period_type": "Yearly",
            "skip_form_validation": true,
            "organisation_unit_levels": [3]
        }
    ]"##;
    let rules: Vec<ValidationRule> = serde_json::from_str(json).unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].operator, Operator::EqualTo);
    assert_eq!(rules[1].period_type, PeriodType::Yearly);
    assert_eq!(
        rules[1].left.missing_value_strategy,
        MissingValueStrategy::SkipIfAnyValueMissing
    );
    assert!(rules[1].skip_form_validation);
    assert!(!rules[1].applies_to_level(2));
}

#[test]
fn test_org_unit_tree_from_json() {
    let json = r#"{
        "id": "root",
        "name": "Country",
        "children": [
            { "id": "d1", "children": [ { "id": "f1" } ] },
            { "id": "d2" }
        ]
    }"#;
    let mut root: OrgUnit = serde_json::from_str(json).unwrap();
    root.normalize_levels();
    let f1 = root.find(&OrgUnitId::from("f1")).unwrap();
    assert_eq!(f1.level, 3);
    assert_eq!(f1.display_name(), "f1");
    assert_eq!(root.descendants().len(), 4);
}

#[test]
fn test_data_row_period_is_iso() {
    let json = r#"{
        "data_element": "deA",
        "period": "2024Q1",
        "org_unit": "ouA",
        "category_combo": "default",
        "attribute_combo": "default",
        "value": 12.5
    }"#;
    let row: DataRow = serde_json::from_str(json).unwrap();
    assert_eq!(row.period, period("2024Q1"));
    assert!(row.period.covers(&period("202402")));
    assert_eq!(serde_json::to_value(&row).unwrap()["period"], "2024Q1");
}

#[test]
fn test_bad_period_in_json_fails() {
    let json = r#"{
        "data_element": "deA",
        "period": "2024X1",
        "org_unit": "ouA",
        "category_combo": "default",
        "attribute_combo": "default",
        "value": 1
    }"#;
    let err = serde_json::from_str::<DataRow>(json).unwrap_err();
    assert!(err.to_string().contains("2024X1"));
}
