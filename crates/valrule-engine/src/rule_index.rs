//! Per period type grouping of rules, periods and required operands
//!
//! Built once per run before any org unit is evaluated. Pure computation
//! over metadata: no data is read here.

use crate::config::EngineConfig;
use crate::context::{PeriodSelection, ValidationContext};
use crate::{EngineError, EngineResult};
use chrono::{NaiveDate, TimeDelta};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use tracing::debug;
use valrule_expr::ExpressionService;
use valrule_model::{DataElementId, DateRange, Operand, Period, PeriodType, ValidationRule};

/// A rule with the operands of both sides resolved
#[derive(Debug, Clone)]
pub struct IndexedRule {
    pub rule: ValidationRule,
    pub left_operands: Vec<Operand>,
    pub right_operands: Vec<Operand>,
}

impl IndexedRule {
    fn new(rule: &ValidationRule, service: &dyn ExpressionService) -> EngineResult<Self> {
        let operands = |text: &str| {
            service
                .operands(text)
                .map_err(|source| EngineError::expression(&rule.id, source))
        };
        Ok(Self {
            left_operands: operands(&rule.left.expression)?,
            right_operands: operands(&rule.right.expression)?,
            rule: rule.clone(),
        })
    }

    fn operands(&self) -> impl Iterator<Item = &Operand> {
        self.left_operands.iter().chain(&self.right_operands)
    }
}

/// A period to evaluate together with the sliding window ending on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodSlot {
    pub period: Period,
    pub window: DateRange,
}

impl PeriodSlot {
    /// Window of `periods` periods ending on `period`
    ///
    /// The end is clamped to `as_of` and the start moves back with it, so the
    /// window keeps its length in days and sits over the most recent data.
    pub fn new(period: Period, periods: u32, as_of: NaiveDate) -> Self {
        let back = i32::try_from(periods.max(1) - 1).unwrap_or(i32::MAX);
        let first = period.shifted(-back);
        let length = i64::from(DateRange {
            start: first.start(),
            end: period.end(),
        }
        .day_count());
        let end = period.end().min(as_of);
        let start = if end < period.end() {
            end - TimeDelta::days(length - 1)
        } else {
            first.start()
        };
        Self {
            period,
            window: DateRange { start, end },
        }
    }
}

/// Rules and periods of one period type
#[derive(Debug, Clone)]
pub struct RuleIndex {
    pub period_type: PeriodType,
    pub rules: Vec<IndexedRule>,
    pub slots: Vec<PeriodSlot>,
    /// Data elements referenced by any rule, for the row fetch
    pub data_elements: BTreeSet<DataElementId>,
    /// Indicator-style operands, for the series query
    pub indicator_items: BTreeSet<Operand>,
    /// Some expression reads a sliding window
    pub needs_sliding: bool,
}

impl RuleIndex {
    fn new(
        period_type: PeriodType,
        rules: Vec<IndexedRule>,
        periods: &[Period],
        config: &EngineConfig,
        as_of: NaiveDate,
    ) -> Self {
        let mut data_elements = BTreeSet::new();
        let mut indicator_items = BTreeSet::new();
        for operand in rules.iter().flat_map(IndexedRule::operands) {
            match operand.data_element() {
                Some(data_element) => {
                    data_elements.insert(data_element.clone());
                }
                None => {
                    indicator_items.insert(operand.clone());
                }
            }
        }
        let needs_sliding = rules.iter().any(|r| r.rule.has_sliding_window());
        let slots = periods
            .iter()
            .map(|period| PeriodSlot::new(*period, config.effective_window(), as_of))
            .collect();
        Self {
            period_type,
            rules,
            slots,
            data_elements,
            indicator_items,
            needs_sliding,
        }
    }

    /// Date spans whose data this index reads
    pub fn spans(&self) -> impl Iterator<Item = DateRange> + '_ {
        self.slots.iter().flat_map(move |slot| {
            let window = self.needs_sliding.then_some(slot.window);
            std::iter::once(slot.period.date_range()).chain(window)
        })
    }
}

/// All rule indices of one run
#[derive(Debug, Clone, Default)]
pub struct RuleIndexSet {
    indices: Vec<RuleIndex>,
}

impl RuleIndexSet {
    /// Index the context's rules over its period selection
    ///
    /// Fails when an expression does not parse.
    pub fn build(
        context: &ValidationContext,
        service: &dyn ExpressionService,
        config: &EngineConfig,
    ) -> EngineResult<Self> {
        let mut periods_by_type: IndexMap<PeriodType, Vec<Period>> = IndexMap::new();
        match context.period_selection() {
            PeriodSelection::Periods(periods) => {
                for period in periods {
                    periods_by_type.entry(period.period_type()).or_default().push(*period);
                }
            }
            PeriodSelection::Range(range) => {
                for rule in context.rules() {
                    periods_by_type
                        .entry(rule.period_type)
                        .or_insert_with(|| rule.period_type.periods_between(range.start, range.end));
                }
            }
        }

        let mut indices = Vec::new();
        for (period_type, mut periods) in periods_by_type {
            periods.sort();
            periods.dedup();
            let rules = context
                .rules()
                .iter()
                .filter(|rule| rule.period_type == period_type)
                .filter(|rule| !(context.form_mode() && rule.skip_form_validation))
                .map(|rule| IndexedRule::new(rule, service))
                .collect::<EngineResult<Vec<_>>>()?;
            if rules.is_empty() || periods.is_empty() {
                continue;
            }
            debug!(
                period_type = %period_type,
                rules = rules.len(),
                periods = periods.len(),
                "indexed period type"
            );
            indices.push(RuleIndex::new(period_type, rules, &periods, config, context.as_of()));
        }
        Ok(Self { indices })
    }

    /// Index a single rule over a single period
    pub fn for_rule(
        rule: &ValidationRule,
        period: Period,
        service: &dyn ExpressionService,
        config: &EngineConfig,
        as_of: NaiveDate,
    ) -> EngineResult<Self> {
        let indexed = IndexedRule::new(rule, service)?;
        Ok(Self {
            indices: vec![RuleIndex::new(
                period.period_type(),
                vec![indexed],
                &[period],
                config,
                as_of,
            )],
        })
    }

    pub fn indices(&self) -> &[RuleIndex] {
        &self.indices
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.indices.iter().map(|index| index.rules.len()).sum()
    }

    pub fn period_count(&self) -> usize {
        self.indices.iter().map(|index| index.slots.len()).sum()
    }

    /// Union of data elements over all indices
    pub fn data_elements(&self) -> Vec<DataElementId> {
        let all: BTreeSet<&DataElementId> = self
            .indices
            .iter()
            .flat_map(|index| &index.data_elements)
            .collect();
        all.into_iter().cloned().collect()
    }

    /// Union of indicator-style operands over all indices
    pub fn indicator_items(&self) -> Vec<Operand> {
        let all: BTreeSet<&Operand> = self
            .indices
            .iter()
            .flat_map(|index| &index.indicator_items)
            .collect();
        all.into_iter().cloned().collect()
    }

    /// Every date span some index reads
    pub fn spans(&self) -> Vec<DateRange> {
        let mut spans: Vec<DateRange> = self.indices.iter().flat_map(RuleIndex::spans).collect();
        spans.sort_by_key(|span| (span.start, span.end));
        spans.dedup();
        spans
    }

    /// Smallest range covering every span
    pub fn covering_range(&self) -> Option<DateRange> {
        let spans = self.spans();
        let start = spans.iter().map(|span| span.start).min()?;
        let end = spans.iter().map(|span| span.end).max()?;
        Some(DateRange { start, end })
    }
}
