//! The record of one rule violation

use crate::{AttributeComboId, OrgUnitId, Period, RuleId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A violated rule instance with the values that violated it
///
/// Identity and ordering use (rule, period, org unit, attribute combo). The
/// side values are evidence, not part of the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub rule: RuleId,
    pub period: Period,
    pub org_unit: OrgUnitId,
    pub attribute_combo: AttributeComboId,
    /// Left side value, 0.0 when that side had no value
    pub left_side: f64,
    /// Right side value, 0.0 when that side had no value
    pub right_side: f64,
    pub day_in_period: u32,
}

impl ValidationResult {
    fn key(&self) -> (&RuleId, &Period, &OrgUnitId, &AttributeComboId) {
        (&self.rule, &self.period, &self.org_unit, &self.attribute_combo)
    }
}

impl PartialEq for ValidationResult {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ValidationResult {}

impl Hash for ValidationResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for ValidationResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ValidationResult {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}
