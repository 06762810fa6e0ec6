//! Evaluation of every rule instance for one org unit

use crate::context::ValidationContext;
use crate::operator::{self, SideValue};
use crate::provider::DataSource;
use crate::rule_index::{IndexedRule, PeriodSlot, RuleIndex, RuleIndexSet};
use crate::value_map::{UnitData, ValueMaps};
use crate::{EngineError, EngineResult};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use valrule_expr::{EvalScope, ExpressionService};
use valrule_model::{
    AttributeComboId, Expression, Grid, Operand, OrgUnit, ValidationResult, ValidationRule,
};

/// The unit of work for one org unit
pub struct OrgUnitEvaluator<'a> {
    context: &'a ValidationContext,
    index: &'a RuleIndexSet,
    service: &'a dyn ExpressionService,
    source: &'a dyn DataSource,
}

/// Value maps of one slot for plain and sliding expressions
struct SlotValues {
    plain: ValueMaps,
    sliding: Option<ValueMaps>,
}

impl SlotValues {
    fn side(&self, expression: &Expression) -> &ValueMaps {
        match (&self.sliding, expression.sliding_window) {
            (Some(sliding), true) => sliding,
            _ => &self.plain,
        }
    }
}

impl<'a> OrgUnitEvaluator<'a> {
    pub fn new(
        context: &'a ValidationContext,
        index: &'a RuleIndexSet,
        service: &'a dyn ExpressionService,
        source: &'a dyn DataSource,
    ) -> Self {
        Self {
            context,
            index,
            service,
            source,
        }
    }

    /// Fetch the org unit's data in one batch
    pub(crate) async fn fetch(&self, org_unit: &OrgUnit) -> EngineResult<UnitData> {
        let data_elements = self.index.data_elements();
        let spans = self.index.spans();
        let rows = if data_elements.is_empty() {
            Vec::new()
        } else {
            self.source
                .get_data_rows(org_unit, &data_elements, &spans)
                .await
                .map_err(|err| EngineError::data_source(&org_unit.id, err.to_string()))?
        };

        let indicator_items = self.index.indicator_items();
        let grid = match self.index.covering_range() {
            Some(range) if !indicator_items.is_empty() => {
                let items: Vec<String> = indicator_items.iter().map(|o| o.dimension_item()).collect();
                self.source
                    .query_indicator_series(&items, org_unit, range)
                    .await
                    .map_err(|err| EngineError::data_source(&org_unit.id, err.to_string()))?
            }
            _ => Grid::default(),
        };
        debug!(rows = rows.len(), indicator_rows = grid.rows.len(), "fetched data");
        Ok(UnitData::new(rows, &grid, &indicator_items))
    }

    /// Evaluate every rule instance for `org_unit`, appending violations to
    /// the context. Returns the number of results appended.
    pub async fn evaluate(&self, org_unit: &OrgUnit) -> EngineResult<usize> {
        if self.context.is_cap_reached() {
            return Ok(0);
        }
        let data = self.fetch(org_unit).await?;
        if data.is_empty() {
            return Ok(0);
        }
        let mut appended = 0;
        for index in self.index.indices() {
            let rules: Vec<&IndexedRule> = index
                .rules
                .iter()
                .filter(|r| r.rule.applies_to_level(org_unit.level))
                .collect();
            if rules.is_empty() {
                continue;
            }
            for slot in &index.slots {
                let values = self.slot_values(index, slot, &data);
                for indexed in &rules {
                    if self.context.is_cap_reached() {
                        debug!("result cap reached");
                        return Ok(appended);
                    }
                    for result in self.evaluate_rule(org_unit, indexed, slot, &values)? {
                        if !self.context.push_result(result) {
                            return Ok(appended);
                        }
                        appended += 1;
                    }
                }
            }
        }
        Ok(appended)
    }

    fn slot_values(&self, index: &RuleIndex, slot: &PeriodSlot, data: &UnitData) -> SlotValues {
        let default_combo = self.context.default_attribute_combo();
        SlotValues {
            plain: data.values_for(slot, false, default_combo),
            sliding: index
                .needs_sliding
                .then(|| data.values_for(slot, true, default_combo)),
        }
    }

    /// Violations of one rule in one slot, one per violating attribute combo
    fn evaluate_rule(
        &self,
        org_unit: &OrgUnit,
        indexed: &IndexedRule,
        slot: &PeriodSlot,
        values: &SlotValues,
    ) -> EngineResult<Vec<ValidationResult>> {
        let rule = &indexed.rule;
        let left_maps = values.side(&rule.left);
        let right_maps = values.side(&rule.right);
        let combos: BTreeSet<&AttributeComboId> = left_maps
            .combos()
            .chain(right_maps.combos())
            .filter(|combo| self.context.attribute_combo().is_none_or(|only| only == *combo))
            .collect();

        let empty = HashMap::new();
        let days = slot.period.day_count();
        let day_in_period = slot.period.day_in_period(self.context.as_of());
        let mut results = Vec::new();
        for combo in combos {
            let left = self.side(
                org_unit,
                rule,
                &rule.left,
                left_maps.get(combo).unwrap_or(&empty),
                days,
            )?;
            let right = self.side(
                org_unit,
                rule,
                &rule.right,
                right_maps.get(combo).unwrap_or(&empty),
                days,
            )?;
            let violated = operator::is_violation(rule.operator, left, right);
            debug!(
                rule = %rule.id,
                period = %slot.period,
                attribute_combo = %combo,
                left = ?left.value,
                right = ?right.value,
                violated,
                "evaluated rule"
            );
            if violated {
                results.push(ValidationResult {
                    rule: rule.id.clone(),
                    period: slot.period,
                    org_unit: org_unit.id.clone(),
                    attribute_combo: combo.clone(),
                    left_side: left.recorded(),
                    right_side: right.recorded(),
                    day_in_period,
                });
            }
        }
        Ok(results)
    }

    fn side(
        &self,
        org_unit: &OrgUnit,
        rule: &ValidationRule,
        expression: &Expression,
        values: &HashMap<Operand, f64>,
        days: u32,
    ) -> EngineResult<SideValue> {
        let declared = expression.missing_value_strategy;
        let scope = EvalScope::new(values, self.context.constants(), days)
            .with_org_unit(&org_unit.id)
            .with_strategy(declared);
        let outcome = self
            .service
            .evaluate(&expression.expression, &scope)
            .map_err(|source| EngineError::expression(&rule.id, source))?;
        Ok(SideValue::new(outcome.value(), declared))
    }
}
