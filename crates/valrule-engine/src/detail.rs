//! Named operand contributions of one rule instance

use crate::evaluator::OrgUnitEvaluator;
use crate::rule_index::{PeriodSlot, RuleIndexSet};
use crate::runner::ValidationRunner;
use crate::{EngineError, EngineResult, ValidationContext};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use valrule_model::{AttributeComboId, Expression, Operand, OrgUnitId, Period, RuleId};

/// One operand and its value, if it had one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailEntry {
    pub name: String,
    pub value: Option<f64>,
}

/// Operand values of both sides of a rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionDetails {
    pub left_side: Vec<DetailEntry>,
    pub right_side: Vec<DetailEntry>,
}

fn entries(
    context: &ValidationContext,
    operands: &[Operand],
    values: Option<&HashMap<Operand, f64>>,
) -> Vec<DetailEntry> {
    operands
        .iter()
        .map(|operand| DetailEntry {
            name: context.item_name(operand),
            value: values.and_then(|values| values.get(operand).copied()),
        })
        .collect()
}

impl ValidationRunner {
    /// Operand values behind one rule for one period, org unit and attribute
    /// combo (the context's default combo when none is given)
    ///
    /// Reads data the same way a run does but produces no results.
    pub async fn expression_details(
        &self,
        context: &ValidationContext,
        rule: &RuleId,
        period: Period,
        org_unit: &OrgUnitId,
        attribute_combo: Option<&AttributeComboId>,
    ) -> EngineResult<ExpressionDetails> {
        let rule = context
            .rule(rule)
            .ok_or_else(|| EngineError::invalid_request(format!("unknown rule {rule}")))?;
        let org_unit = context
            .find_org_unit(org_unit)
            .map(|unit| unit.detached())
            .ok_or_else(|| EngineError::invalid_request(format!("unknown org unit {org_unit}")))?;
        if period.period_type() != rule.period_type {
            return Err(EngineError::invalid_request(format!(
                "rule {} has period type {}, not {}",
                rule.id,
                rule.period_type,
                period.period_type()
            )));
        }

        let index = RuleIndexSet::for_rule(
            rule,
            period,
            self.service(),
            self.config(),
            context.as_of(),
        )?;
        let evaluator = OrgUnitEvaluator::new(context, &index, self.service(), self.source());
        let data = evaluator.fetch(&org_unit).await?;

        let combo = attribute_combo.unwrap_or_else(|| context.default_attribute_combo());
        let slot = PeriodSlot::new(period, self.config().effective_window(), context.as_of());
        let default_combo = context.default_attribute_combo();
        let side = |expression: &Expression, operands: &[Operand]| {
            let maps = data.values_for(&slot, expression.sliding_window, default_combo);
            entries(context, operands, maps.get(combo))
        };

        let Some(indexed) = index.indices().first().and_then(|i| i.rules.first()) else {
            return Ok(ExpressionDetails::default());
        };
        Ok(ExpressionDetails {
            left_side: side(&rule.left, &indexed.left_operands),
            right_side: side(&rule.right, &indexed.right_operands),
        })
    }
}
