//! The expression service consumed by the validation engine

use crate::eval::{self, ItemCounts};
use crate::{Expr, ExprResult, parse_expression};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;
use valrule_model::{MissingValueStrategy, Operand, OrgUnitId};

/// Everything an expression can read during one evaluation
#[derive(Debug, Clone, Copy)]
pub struct EvalScope<'a> {
    /// Operand values for one period and attribute combo
    pub values: &'a HashMap<Operand, f64>,
    /// Constant id to value
    pub constants: &'a HashMap<String, f64>,
    /// Org unit being evaluated, if any
    pub org_unit: Option<&'a OrgUnitId>,
    /// Value of `[days]`
    pub days: u32,
    pub strategy: MissingValueStrategy,
}

impl<'a> EvalScope<'a> {
    pub fn new(
        values: &'a HashMap<Operand, f64>,
        constants: &'a HashMap<String, f64>,
        days: u32,
    ) -> Self {
        Self {
            values,
            constants,
            org_unit: None,
            days,
            strategy: MissingValueStrategy::default(),
        }
    }

    pub fn with_org_unit(mut self, org_unit: &'a OrgUnitId) -> Self {
        self.org_unit = Some(org_unit);
        self
    }

    pub fn with_strategy(mut self, strategy: MissingValueStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Result of evaluating one expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExprOutcome {
    Value(f64),
    /// Missing-value strategy or a null or non-finite result says: no value
    Skip,
}

impl ExprOutcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            ExprOutcome::Value(v) => Some(*v),
            ExprOutcome::Skip => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, ExprOutcome::Skip)
    }
}

/// Parses and evaluates rule expressions
///
/// Errors mean the expression text itself is unusable.
pub trait ExpressionService: Send + Sync {
    /// Every operand the expression references, in order of first appearance
    fn operands(&self, expression: &str) -> ExprResult<Vec<Operand>>;

    /// Evaluate under the scope's missing-value strategy
    fn evaluate(&self, expression: &str, scope: &EvalScope<'_>) -> ExprResult<ExprOutcome>;

    /// Check that the expression parses
    fn validate(&self, expression: &str) -> ExprResult<()> {
        self.operands(expression).map(|_| ())
    }
}

/// Default expression service with a concurrency-safe parse cache
#[derive(Debug, Default)]
pub struct ExpressionEngine {
    cache: RwLock<HashMap<String, Arc<Expr>>>,
}

impl ExpressionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text`, reusing an earlier parse of the same text
    pub fn parse(&self, text: &str) -> ExprResult<Arc<Expr>> {
        if let Some(expr) = self.cache.read().get(text) {
            return Ok(Arc::clone(expr));
        }
        let expr = Arc::new(parse_expression(text)?);
        self.cache
            .write()
            .entry(text.to_string())
            .or_insert_with(|| Arc::clone(&expr));
        Ok(expr)
    }

    /// Number of distinct expressions parsed so far
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

impl ExpressionService for ExpressionEngine {
    fn operands(&self, expression: &str) -> ExprResult<Vec<Operand>> {
        Ok(self.parse(expression)?.operands())
    }

    fn evaluate(&self, expression: &str, scope: &EvalScope<'_>) -> ExprResult<ExprOutcome> {
        let expr = self.parse(expression)?;
        let counts = ItemCounts::of(&expr, scope);
        if counts.should_skip(scope.strategy) {
            trace!(
                expression,
                items = counts.items,
                missing = counts.missing,
                strategy = ?scope.strategy,
                "skipped for missing values"
            );
            return Ok(ExprOutcome::Skip);
        }
        let outcome = match eval::evaluate(&expr, scope)?.as_number() {
            Some(value) if value.is_finite() => ExprOutcome::Value(value),
            _ => ExprOutcome::Skip,
        };
        trace!(expression, org_unit = ?scope.org_unit, ?outcome, "evaluated");
        Ok(outcome)
    }
}
