//! Validation rules, expressions and operators

use crate::{ModelError, OrgUnitId, PeriodType, RuleGroupId, RuleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Comparison between the two sides of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    CompulsoryPair,
    ExclusivePair,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Operator::EqualTo,
        Operator::NotEqualTo,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqualTo,
        Operator::LessThan,
        Operator::LessThanOrEqualTo,
        Operator::CompulsoryPair,
        Operator::ExclusivePair,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operator::EqualTo => "equal_to",
            Operator::NotEqualTo => "not_equal_to",
            Operator::GreaterThan => "greater_than",
            Operator::GreaterThanOrEqualTo => "greater_than_or_equal_to",
            Operator::LessThan => "less_than",
            Operator::LessThanOrEqualTo => "less_than_or_equal_to",
            Operator::CompulsoryPair => "compulsory_pair",
            Operator::ExclusivePair => "exclusive_pair",
        }
    }

    /// Mathematical symbol used when rendering a rule
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::EqualTo => "==",
            Operator::NotEqualTo => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqualTo => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqualTo => "<=",
            Operator::CompulsoryPair => "[Compulsory pair]",
            Operator::ExclusivePair => "[Exclusive pair]",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| ModelError::UnknownOperator(s.to_string()))
    }
}

/// What to do when operands referenced by an expression have no value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingValueStrategy {
    /// Skip only when every referenced operand is missing
    #[default]
    SkipIfAllValuesMissing,
    /// Skip when at least one referenced operand is missing
    SkipIfAnyValueMissing,
    /// Substitute zero and always evaluate
    NeverSkip,
}

/// One side of a validation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub expression: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub missing_value_strategy: MissingValueStrategy,
    #[serde(default)]
    pub sliding_window: bool,
}

impl Expression {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            description: None,
            missing_value_strategy: MissingValueStrategy::default(),
            sliding_window: false,
        }
    }

    pub fn with_strategy(mut self, strategy: MissingValueStrategy) -> Self {
        self.missing_value_strategy = strategy;
        self
    }

    pub fn sliding(mut self) -> Self {
        self.sliding_window = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A pair of expressions related by an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub id: RuleId,
    #[serde(default)]
    pub name: String,
    pub operator: Operator,
    pub left: Expression,
    pub right: Expression,
    pub period_type: PeriodType,
    /// Excluded when validating a single data entry form
    #[serde(default)]
    pub skip_form_validation: bool,
    /// Org unit levels this rule applies to; empty means every level
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub organisation_unit_levels: BTreeSet<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

impl ValidationRule {
    pub fn new(
        id: impl Into<RuleId>,
        left: Expression,
        operator: Operator,
        right: Expression,
        period_type: PeriodType,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            operator,
            left,
            right,
            period_type,
            skip_form_validation: false,
            organisation_unit_levels: BTreeSet::new(),
            instruction: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn skip_form_validation(mut self) -> Self {
        self.skip_form_validation = true;
        self
    }

    pub fn with_levels(mut self, levels: impl IntoIterator<Item = u32>) -> Self {
        self.organisation_unit_levels = levels.into_iter().collect();
        self
    }

    /// Whether the rule runs for an org unit at `level`
    pub fn applies_to_level(&self, level: u32) -> bool {
        self.organisation_unit_levels.is_empty() || self.organisation_unit_levels.contains(&level)
    }

    /// Both expressions of the rule
    pub fn expressions(&self) -> [&Expression; 2] {
        [&self.left, &self.right]
    }

    /// Whether either side reads a sliding window
    pub fn has_sliding_window(&self) -> bool {
        self.left.sliding_window || self.right.sliding_window
    }
}

/// A named set of rules, selectable as a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub id: RuleGroupId,
    #[serde(default)]
    pub name: String,
    pub rules: Vec<RuleId>,
    /// Org units the group is assigned to, informational only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub org_units: Vec<OrgUnitId>,
}
