//! Validation Run Tests
//!
//! End-to-end runs over an in-memory data source:
//! - Operator semantics and recorded side values
//! - Missing-value strategies, pair operators and `[days]`
//! - Category and attribute option combos
//! - Sliding windows, org unit levels, form mode and date ranges
//! - Result cap, cancellation and failure isolation

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use valrule_engine::{
    EngineConfig, EngineError, InMemoryDataSource, IndicatorRow, Metadata, ProgressSink,
    ValidationContext, ValidationContextBuilder, ValidationRunner, ValidationSummary,
};
use valrule_model::{
    DataRow, DateRange, Expression, MissingValueStrategy, Operator, OrgUnit, OrgUnitId, Period,
    PeriodType, ValidationRule,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn period(id: &str) -> Period {
    Period::parse(id).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn value(de: &str, period_id: &str, ou: &str, value: f64) -> DataRow {
    combo_value(de, "default", period_id, ou, "default", value)
}

fn combo_value(de: &str, coc: &str, period_id: &str, ou: &str, aoc: &str, value: f64) -> DataRow {
    DataRow {
        data_element: de.into(),
        period: period(period_id),
        org_unit: ou.into(),
        category_combo: coc.into(),
        attribute_combo: aoc.into(),
        value,
    }
}

fn rule(id: &str, left: Expression, operator: Operator, right: Expression) -> ValidationRule {
    ValidationRule::new(id, left, operator, right, PeriodType::Monthly)
}

fn expr(text: &str) -> Expression {
    Expression::new(text)
}

fn never_skip(text: &str) -> Expression {
    Expression::new(text).with_strategy(MissingValueStrategy::NeverSkip)
}

/// ouA (level 1) > ouB (level 2) > ouC (level 3)
fn hierarchy() -> OrgUnit {
    OrgUnit::new("ouA", "Country")
        .with_child(OrgUnit::new("ouB", "District").with_child(OrgUnit::new("ouC", "Facility")))
}

fn metadata(rules: Vec<ValidationRule>) -> Metadata {
    let mut metadata = Metadata::new().with_org_unit(hierarchy());
    metadata.rules = rules;
    metadata
}

fn runner(source: InMemoryDataSource) -> ValidationRunner {
    ValidationRunner::new(Arc::new(source))
        .with_config(EngineConfig::default().with_max_concurrency(2))
}

async fn run_with(
    metadata: &Metadata,
    runner: &ValidationRunner,
    configure: impl FnOnce(ValidationContextBuilder<'_>) -> ValidationContextBuilder<'_>,
) -> ValidationSummary {
    let builder = ValidationContext::builder(metadata)
        .org_unit("ouA")
        .as_of(date(2030, 1, 1));
    let context = configure(builder).build().unwrap();
    runner.run(&context).await.unwrap()
}

async fn run(
    rules: Vec<ValidationRule>,
    rows: Vec<DataRow>,
    periods: &[&str],
) -> ValidationSummary {
    let metadata = metadata(rules);
    let runner = runner(InMemoryDataSource::new().with_rows(rows));
    let periods: Vec<Period> = periods.iter().map(|id| period(id)).collect();
    run_with(&metadata, &runner, |b| b.periods(periods)).await
}

/// (rule, period, attribute combo, left, right)
fn rows_of(summary: &ValidationSummary) -> Vec<(String, String, String, f64, f64)> {
    summary
        .results
        .iter()
        .map(|r| {
            (
                r.rule.to_string(),
                r.period.to_string(),
                r.attribute_combo.to_string(),
                r.left_side,
                r.right_side,
            )
        })
        .collect()
}

fn abcd(period_id: &str) -> Vec<DataRow> {
    vec![
        value("A", period_id, "ouA", 1.0),
        value("B", period_id, "ouA", 2.0),
        value("C", period_id, "ouA", 3.0),
        value("D", period_id, "ouA", 4.0),
    ]
}

// ============================================================================
// Operators
// ============================================================================

#[tokio::test]
async fn test_equal_to_and_greater_than() {
    let summary = run(
        vec![
            rule("ruleA", expr("#{A} + #{B}"), Operator::EqualTo, expr("#{C} - #{D}")),
            rule("ruleB", expr("#{C} - #{D}"), Operator::GreaterThan, expr("#{B} * 2")),
            rule("ruleOk", expr("#{A} + #{B}"), Operator::EqualTo, expr("#{C}")),
        ],
        abcd("202401"),
        &["202401"],
    )
    .await;
    assert_eq!(
        rows_of(&summary),
        vec![
            ("ruleA".into(), "202401".into(), "default".into(), 3.0, -1.0),
            ("ruleB".into(), "202401".into(), "default".into(), -1.0, 4.0),
        ]
    );
    assert_eq!(summary.results[0].day_in_period, 31);
    assert!(!summary.truncated);
}

#[tokio::test]
async fn test_not_equal_to_identical_sides() {
    let rows = vec![
        value("A", "202402", "ouA", 1.0),
        value("A", "202403", "ouA", 2.0),
        value("B", "202403", "ouA", 3.0),
    ];
    let sides = |strategy| Expression::new("#{A} + #{B}").with_strategy(strategy);
    let rules = vec![
        rule(
            "never",
            sides(MissingValueStrategy::NeverSkip),
            Operator::NotEqualTo,
            sides(MissingValueStrategy::NeverSkip),
        ),
        rule(
            "all",
            sides(MissingValueStrategy::SkipIfAllValuesMissing),
            Operator::NotEqualTo,
            sides(MissingValueStrategy::SkipIfAllValuesMissing),
        ),
        rule(
            "any",
            sides(MissingValueStrategy::SkipIfAnyValueMissing),
            Operator::NotEqualTo,
            sides(MissingValueStrategy::SkipIfAnyValueMissing),
        ),
    ];
    let summary = run(rules, rows, &["202401", "202402", "202403"]).await;
    assert_eq!(
        rows_of(&summary),
        vec![
            ("all".into(), "202402".into(), "default".into(), 1.0, 1.0),
            ("all".into(), "202403".into(), "default".into(), 5.0, 5.0),
            ("any".into(), "202403".into(), "default".into(), 5.0, 5.0),
            ("never".into(), "202402".into(), "default".into(), 1.0, 1.0),
            ("never".into(), "202403".into(), "default".into(), 5.0, 5.0),
        ]
    );
}

#[tokio::test]
async fn test_never_skip_reads_missing_as_zero() {
    let summary = run(
        vec![rule("ruleG", never_skip("#{C}"), Operator::EqualTo, never_skip("#{D}"))],
        vec![value("D", "202401", "ouA", 1.0)],
        &["202401"],
    )
    .await;
    assert_eq!(
        rows_of(&summary),
        vec![("ruleG".into(), "202401".into(), "default".into(), 0.0, 1.0)]
    );
}

#[tokio::test]
async fn test_skipped_side_produces_no_result() {
    let summary = run(
        vec![rule("r", expr("#{C}"), Operator::EqualTo, expr("#{D}"))],
        vec![value("D", "202401", "ouA", 1.0)],
        &["202401"],
    )
    .await;
    assert!(summary.results.is_empty());
}

#[tokio::test]
async fn test_compulsory_pair() {
    let rules = vec![rule(
        "pair",
        expr("#{A}"),
        Operator::CompulsoryPair,
        expr("#{B}"),
    )];
    let rows = vec![
        // 202401: neither, 202402: right only, 202403: left only, 202404: both
        value("X", "202401", "ouA", 9.0),
        value("B", "202402", "ouA", 1.0),
        value("A", "202403", "ouA", 1.0),
        value("A", "202404", "ouA", 1.0),
        value("B", "202404", "ouA", 2.0),
    ];
    let summary = run(rules, rows, &["202401", "202402", "202403", "202404"]).await;
    assert_eq!(
        rows_of(&summary),
        vec![
            ("pair".into(), "202402".into(), "default".into(), 0.0, 1.0),
            ("pair".into(), "202403".into(), "default".into(), 1.0, 0.0),
        ]
    );
}

#[tokio::test]
async fn test_compulsory_pair_never_skip_side_without_data_is_absent() {
    let rules = vec![rule(
        "pair",
        never_skip("#{A}"),
        Operator::CompulsoryPair,
        never_skip("#{B}"),
    )];
    let summary = run(rules, vec![value("B", "202401", "ouA", 1.0)], &["202401"]).await;
    assert_eq!(
        rows_of(&summary),
        vec![("pair".into(), "202401".into(), "default".into(), 0.0, 1.0)]
    );
}

#[tokio::test]
async fn test_exclusive_pair() {
    let rules = vec![rule(
        "excl",
        expr("#{A}"),
        Operator::ExclusivePair,
        expr("#{B}"),
    )];
    let rows = vec![
        value("A", "202401", "ouA", 1.0),
        value("A", "202402", "ouA", 1.0),
        value("B", "202402", "ouA", 2.0),
    ];
    let summary = run(rules, rows, &["202401", "202402"]).await;
    assert_eq!(
        rows_of(&summary),
        vec![("excl".into(), "202402".into(), "default".into(), 1.0, 2.0)]
    );
}

fn never_skip_pair_rows() -> Vec<DataRow> {
    vec![
        // 202401: zero only, 202402: right only, 202403: left only, 202404: both
        value("A", "202401", "ouA", 0.0),
        value("A", "202402", "ouA", 0.0),
        value("B", "202402", "ouA", 2.0),
        value("A", "202403", "ouA", 3.0),
        value("B", "202403", "ouA", 0.0),
        value("A", "202404", "ouA", 3.0),
        value("B", "202404", "ouA", 2.0),
    ]
}

#[tokio::test]
async fn test_compulsory_pair_never_skip_zero_is_absent() {
    let rules = vec![rule(
        "pair",
        never_skip("#{A}"),
        Operator::CompulsoryPair,
        never_skip("#{B}"),
    )];
    let summary = run(
        rules,
        never_skip_pair_rows(),
        &["202401", "202402", "202403", "202404"],
    )
    .await;
    assert_eq!(
        rows_of(&summary),
        vec![
            ("pair".into(), "202402".into(), "default".into(), 0.0, 2.0),
            ("pair".into(), "202403".into(), "default".into(), 3.0, 0.0),
        ]
    );
}

#[tokio::test]
async fn test_exclusive_pair_never_skip_zero_is_absent() {
    let rules = vec![rule(
        "excl",
        never_skip("#{A}"),
        Operator::ExclusivePair,
        never_skip("#{B}"),
    )];
    let summary = run(
        rules,
        never_skip_pair_rows(),
        &["202401", "202402", "202403", "202404"],
    )
    .await;
    assert_eq!(
        rows_of(&summary),
        vec![("excl".into(), "202404".into(), "default".into(), 3.0, 2.0)]
    );
}

#[tokio::test]
async fn test_pair_never_skip_expression_evaluating_to_zero_is_absent() {
    let rules = vec![rule(
        "pair",
        never_skip("#{A} - #{B}"),
        Operator::CompulsoryPair,
        never_skip("#{C}"),
    )];
    let rows = vec![
        value("A", "202401", "ouA", 4.0),
        value("B", "202401", "ouA", 4.0),
    ];
    let summary = run(rules, rows, &["202401"]).await;
    assert!(summary.results.is_empty());
}

// ============================================================================
// Days and functions
// ============================================================================

#[tokio::test]
async fn test_days_matches_period_length() {
    let monthly = rule("ruleP", expr("#{A}"), Operator::EqualTo, expr("[days]"));
    let yearly = ValidationRule::new(
        "ruleQ",
        expr("#{A}"),
        Operator::EqualTo,
        expr("[days]"),
        PeriodType::Yearly,
    );
    let rows = vec![
        value("A", "202401", "ouA", 1111.0),
        value("A", "2024", "ouA", 2222.0),
    ];
    let summary = run(vec![monthly, yearly], rows, &["202401", "2024"]).await;
    assert_eq!(
        rows_of(&summary),
        vec![
            ("ruleP".into(), "202401".into(), "default".into(), 1111.0, 31.0),
            ("ruleQ".into(), "2024".into(), "default".into(), 2222.0, 366.0),
        ]
    );
}

#[tokio::test]
async fn test_function_rules() {
    let rules = vec![
        rule(
            "if",
            expr("if(#{A} == 1, 5, 6)"),
            Operator::EqualTo,
            expr("if(#{A} == 2, 7, 8)"),
        ),
        rule(
            "null",
            expr("if(isNull(#{B}), 6, 0)"),
            Operator::EqualTo,
            expr("if(isNotNull(#{A}), 7, 0)"),
        ),
        rule(
            "greatest",
            expr("greatest(#{A}, 20)"),
            Operator::LessThan,
            expr("least(#{A}, 10)"),
        ),
    ];
    let summary = run(rules, vec![value("A", "202401", "ouA", 1.0)], &["202401"]).await;
    assert_eq!(
        rows_of(&summary),
        vec![
            ("greatest".into(), "202401".into(), "default".into(), 20.0, 1.0),
            ("if".into(), "202401".into(), "default".into(), 5.0, 8.0),
            ("null".into(), "202401".into(), "default".into(), 6.0, 7.0),
        ]
    );
}

// ============================================================================
// Disaggregation
// ============================================================================

#[tokio::test]
async fn test_category_option_combos() {
    let rules = vec![rule(
        "coc",
        never_skip("#{D}"),
        Operator::EqualTo,
        never_skip("#{D.cocA} * 2 + #{D.cocB}"),
    )];
    let rows = vec![
        combo_value("D", "cocA", "202401", "ouA", "default", 3.0),
        combo_value("D", "cocB", "202401", "ouA", "default", 4.0),
    ];
    let summary = run(rules, rows, &["202401"]).await;
    assert_eq!(
        rows_of(&summary),
        vec![("coc".into(), "202401".into(), "default".into(), 7.0, 10.0)]
    );
}

fn attribute_setup() -> (Metadata, ValidationRunner) {
    let rules = vec![rule(
        "aoc",
        expr("#{A} + #{B}"),
        Operator::LessThan,
        expr("#{B} * 2"),
    )];
    let rows = vec![
        combo_value("A", "default", "202401", "ouA", "AC", 4.0),
        combo_value("B", "default", "202401", "ouA", "AC", 3.0),
        combo_value("A", "default", "202401", "ouA", "BC", 2.0),
        combo_value("B", "default", "202401", "ouA", "BC", 1.0),
    ];
    (
        metadata(rules),
        runner(InMemoryDataSource::new().with_rows(rows)),
    )
}

#[tokio::test]
async fn test_every_observed_attribute_combo_is_evaluated() {
    let (metadata, runner) = attribute_setup();
    let summary = run_with(&metadata, &runner, |b| b.period(period("202401"))).await;
    assert_eq!(
        rows_of(&summary),
        vec![
            ("aoc".into(), "202401".into(), "AC".into(), 7.0, 6.0),
            ("aoc".into(), "202401".into(), "BC".into(), 3.0, 2.0),
        ]
    );
}

#[tokio::test]
async fn test_attribute_combo_filter() {
    let (metadata, runner) = attribute_setup();
    let summary = run_with(&metadata, &runner, |b| {
        b.period(period("202401")).attribute_combo("BC")
    })
    .await;
    assert_eq!(
        rows_of(&summary),
        vec![("aoc".into(), "202401".into(), "BC".into(), 3.0, 2.0)]
    );

    let summary = run_with(&metadata, &runner, |b| {
        b.period(period("202401")).attribute_combo("default")
    })
    .await;
    assert!(summary.results.is_empty());
}

#[tokio::test]
async fn test_indicator_operands_apply_to_observed_combos() {
    let metadata = metadata(vec![rule(
        "pi",
        expr("I{piA}"),
        Operator::LessThanOrEqualTo,
        expr("#{A}"),
    )]);
    let source = InMemoryDataSource::new()
        .with_rows(vec![combo_value("A", "default", "202401", "ouA", "AC", 4.0)])
        .with_indicators(vec![IndicatorRow {
            item: "piA".into(),
            period: period("202401"),
            org_unit: "ouA".into(),
            attribute_combo: None,
            value: 5.0,
        }]);
    let runner = runner(source);
    let summary = run_with(&metadata, &runner, |b| b.period(period("202401"))).await;
    assert_eq!(
        rows_of(&summary),
        vec![("pi".into(), "202401".into(), "AC".into(), 5.0, 4.0)]
    );
}

// ============================================================================
// Periods
// ============================================================================

#[tokio::test]
async fn test_sliding_window_collapses_to_single_period() {
    let rules = vec![rule(
        "slide",
        expr("#{A}").sliding(),
        Operator::NotEqualTo,
        expr("#{A}"),
    )];
    let rows = vec![
        value("A", "202401", "ouA", 1.0),
        value("A", "202402", "ouA", 2.0),
        value("A", "202403", "ouA", 4.0),
    ];
    let summary = run(rules, rows, &["202403"]).await;
    assert_eq!(
        rows_of(&summary),
        vec![("slide".into(), "202403".into(), "default".into(), 4.0, 4.0)]
    );
}

#[tokio::test]
async fn test_sliding_window_sums_configured_periods() {
    let metadata = metadata(vec![rule(
        "slide",
        expr("#{A}").sliding(),
        Operator::EqualTo,
        expr("#{A}"),
    )]);
    let rows = vec![
        value("A", "202401", "ouA", 1.0),
        value("A", "202402", "ouA", 2.0),
        value("A", "202403", "ouA", 4.0),
    ];
    let runner = runner(InMemoryDataSource::new().with_rows(rows))
        .with_config(EngineConfig::default().with_sliding_window_periods(3));
    let summary = run_with(&metadata, &runner, |b| b.period(period("202403"))).await;
    assert_eq!(
        rows_of(&summary),
        vec![("slide".into(), "202403".into(), "default".into(), 7.0, 4.0)]
    );
}

#[tokio::test]
async fn test_date_range_expands_per_rule_period_type() {
    let monthly = rule("m", never_skip("#{A}"), Operator::NotEqualTo, never_skip("#{A}"));
    let quarterly = ValidationRule::new(
        "q",
        never_skip("#{A}"),
        Operator::NotEqualTo,
        never_skip("#{A}"),
        PeriodType::Quarterly,
    );
    let metadata = metadata(vec![monthly, quarterly]);
    let rows = vec![
        value("A", "202401", "ouA", 1.0),
        value("A", "202402", "ouA", 1.0),
        value("A", "2024Q1", "ouA", 3.0),
        value("A", "202404", "ouA", 1.0),
    ];
    let runner = runner(InMemoryDataSource::new().with_rows(rows));
    let range = DateRange::new(date(2024, 1, 1), date(2024, 3, 31)).unwrap();
    let summary = run_with(&metadata, &runner, |b| b.date_range(range)).await;
    let keys: Vec<(String, String)> = summary
        .results
        .iter()
        .map(|r| (r.rule.to_string(), r.period.to_string()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("m".into(), "202401".into()),
            ("m".into(), "202402".into()),
            ("m".into(), "202403".into()),
            ("q".into(), "2024Q1".into()),
        ]
    );
}

#[tokio::test]
async fn test_day_in_period_uses_as_of() {
    let metadata = metadata(vec![rule(
        "r",
        never_skip("#{A}"),
        Operator::NotEqualTo,
        never_skip("#{A}"),
    )]);
    let runner = runner(InMemoryDataSource::new().with_rows(vec![value("A", "202401", "ouA", 1.0)]));
    let summary = run_with(&metadata, &runner, |b| {
        b.period(period("202401")).as_of(date(2024, 1, 10))
    })
    .await;
    assert_eq!(summary.results[0].day_in_period, 10);
}

// ============================================================================
// Rule selection
// ============================================================================

#[tokio::test]
async fn test_org_unit_levels_and_descendants() {
    let facility_only = rule("facility", never_skip("#{A}"), Operator::NotEqualTo, never_skip("#{A}"))
        .with_levels([3]);
    let everywhere = rule("all", never_skip("#{A}"), Operator::NotEqualTo, never_skip("#{A}"));
    let metadata = metadata(vec![facility_only, everywhere]);
    let rows = ["ouA", "ouB", "ouC"]
        .iter()
        .map(|ou| value("A", "202401", ou, 1.0))
        .collect::<Vec<_>>();
    let runner = runner(InMemoryDataSource::new().with_rows(rows));
    let summary = run_with(&metadata, &runner, |b| {
        b.period(period("202401")).include_descendants(true)
    })
    .await;
    let keys: Vec<(String, String)> = summary
        .results
        .iter()
        .map(|r| (r.rule.to_string(), r.org_unit.to_string()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("all".into(), "ouA".into()),
            ("all".into(), "ouB".into()),
            ("all".into(), "ouC".into()),
            ("facility".into(), "ouC".into()),
        ]
    );
}

#[tokio::test]
async fn test_form_mode_skips_flagged_rules() {
    let skipped = rule("skipped", never_skip("#{A}"), Operator::NotEqualTo, never_skip("#{A}"))
        .skip_form_validation();
    let kept = rule("kept", never_skip("#{A}"), Operator::NotEqualTo, never_skip("#{A}"));
    let metadata = metadata(vec![skipped, kept]);
    let runner = runner(InMemoryDataSource::new().with_rows(vec![value("A", "202401", "ouA", 1.0)]));

    let summary = run_with(&metadata, &runner, |b| b.period(period("202401")).form_mode(true)).await;
    let rules: Vec<String> = summary.results.iter().map(|r| r.rule.to_string()).collect();
    assert_eq!(rules, vec!["kept"]);

    let summary = run_with(&metadata, &runner, |b| b.period(period("202401"))).await;
    assert_eq!(summary.results.len(), 2);
}

// ============================================================================
// Run control
// ============================================================================

fn wide_tree(units: usize) -> OrgUnit {
    (0..units).fold(OrgUnit::new("root", "Root"), |root, i| {
        root.with_child(OrgUnit::new(format!("ou{i}"), ""))
    })
}

fn wide_setup(units: usize) -> (Metadata, InMemoryDataSource) {
    let mut metadata = Metadata::new().with_org_unit(wide_tree(units));
    metadata.rules = vec![rule(
        "r",
        never_skip("#{A}"),
        Operator::NotEqualTo,
        never_skip("#{A}"),
    )];
    let rows = (0..units)
        .map(|i| value("A", "202401", &format!("ou{i}"), 1.0))
        .collect::<Vec<_>>();
    (metadata, InMemoryDataSource::new().with_rows(rows))
}

fn wide_context(metadata: &Metadata, max_results: usize) -> ValidationContext {
    ValidationContext::builder(metadata)
        .org_unit("root")
        .include_descendants(true)
        .period(period("202401"))
        .max_results(max_results)
        .as_of(date(2030, 1, 1))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_cap_truncates_results() {
    let (metadata, source) = wide_setup(10);
    let runner = runner(source);
    let summary = runner.run(&wide_context(&metadata, 3)).await.unwrap();
    assert_eq!(summary.results.len(), 3);
    assert!(summary.truncated);
}

#[tokio::test]
async fn test_cap_equal_to_violation_count_keeps_every_result() {
    let (metadata, source) = wide_setup(4);
    let runner = runner(source);
    let summary = runner.run(&wide_context(&metadata, 4)).await.unwrap();
    assert_eq!(summary.results.len(), 4);
    // The cap was hit even though nothing was dropped.
    assert!(summary.truncated);
}

#[tokio::test]
async fn test_repeated_rule_ids_do_not_spend_the_cap() {
    let (metadata, source) = wide_setup(3);
    let runner = ValidationRunner::new(Arc::new(source))
        .with_config(EngineConfig::default().with_max_concurrency(1));
    let context = ValidationContext::builder(&metadata)
        .rules(["r", "r"])
        .org_units(["ou0", "ou1", "ou2"])
        .period(period("202401"))
        .max_results(2)
        .as_of(date(2030, 1, 1))
        .build()
        .unwrap();
    let summary = runner.run(&context).await.unwrap();
    let units: Vec<String> = summary.results.iter().map(|r| r.org_unit.to_string()).collect();
    assert_eq!(units, vec!["ou0", "ou1"]);
    assert!(summary.truncated);
}

proptest! {
    #[test]
    fn prop_cap_is_never_exceeded(units in 1usize..12, cap in 1usize..15, concurrency in 1usize..4) {
        let (metadata, source) = wide_setup(units);
        let runner = ValidationRunner::new(Arc::new(source))
            .with_config(EngineConfig::default().with_max_concurrency(concurrency));
        let context = wide_context(&metadata, cap);
        let summary = futures::executor::block_on(runner.run(&context)).unwrap();
        prop_assert_eq!(summary.results.len(), units.min(cap));
    }
}

#[tokio::test]
async fn test_failed_unit_is_isolated() {
    let (metadata, source) = wide_setup(4);
    let runner = runner(source.failing_for("ou2"));
    let summary = runner.run(&wide_context(&metadata, 0)).await.unwrap();
    let units: Vec<String> = summary.results.iter().map(|r| r.org_unit.to_string()).collect();
    assert_eq!(units, vec!["ou0", "ou1", "ou3"]);
    assert_eq!(summary.failed_units.len(), 1);
    assert_eq!(summary.failed_units[0].org_unit, OrgUnitId::from("ou2"));
}

#[tokio::test]
async fn test_bad_expression_is_fatal() {
    let (mut metadata, source) = wide_setup(2);
    metadata.rules.push(rule("broken", expr("#{A} +"), Operator::EqualTo, expr("1")));
    let runner = runner(source);
    let err = runner.run(&wide_context(&metadata, 0)).await.unwrap_err();
    assert!(matches!(err, EngineError::Expression { ref rule, .. } if rule.as_str() == "broken"));
}

/// Cancels after the first finished org unit
#[derive(Default)]
struct CancelAfterFirst {
    cancelled: AtomicBool,
}

impl ProgressSink for CancelAfterFirst {
    fn tick(&self, _org_unit: &OrgUnitId) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn test_cancellation_returns_partial_results() {
    let (metadata, source) = wide_setup(5);
    let runner = ValidationRunner::new(Arc::new(source))
        .with_config(EngineConfig::default().with_max_concurrency(1))
        .with_progress(Arc::new(CancelAfterFirst::default()));
    let context = ValidationContext::builder(&metadata)
        .org_units(["ou0", "ou1", "ou2", "ou3", "ou4"])
        .period(period("202401"))
        .as_of(date(2030, 1, 1))
        .build()
        .unwrap();
    let summary = runner.run(&context).await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.results.len(), 1);
    assert!(!summary.truncated);
}
