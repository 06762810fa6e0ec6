//! Operator semantics: when does a pair of side values violate a rule

use valrule_model::{MissingValueStrategy, Operator};

/// One evaluated side of a rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideValue {
    /// `None` when the side was skipped
    pub value: Option<f64>,
    pub strategy: MissingValueStrategy,
}

impl SideValue {
    pub fn new(value: Option<f64>, strategy: MissingValueStrategy) -> Self {
        Self { value, strategy }
    }

    /// Presence as pair operators see it: under never-skip a zero is absent
    pub fn is_present(&self) -> bool {
        match self.strategy {
            MissingValueStrategy::NeverSkip => self.value.is_some_and(|v| v != 0.0),
            _ => self.value.is_some(),
        }
    }

    /// Value recorded on a result: zero for an absent side
    pub fn recorded(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }

    /// Value used for comparison, if the side takes part at all
    fn comparable(&self) -> Option<f64> {
        match (self.value, self.strategy) {
            (Some(value), _) => Some(value),
            (None, MissingValueStrategy::NeverSkip) => Some(0.0),
            (None, _) => None,
        }
    }
}

/// Whether `operator` holds between two numbers
pub fn holds(operator: Operator, left: f64, right: f64) -> bool {
    match operator {
        Operator::EqualTo => left == right,
        Operator::NotEqualTo => left != right,
        Operator::GreaterThan => left > right,
        Operator::GreaterThanOrEqualTo => left >= right,
        Operator::LessThan => left < right,
        Operator::LessThanOrEqualTo => left <= right,
        // Both sides carry numbers, so both are present.
        Operator::CompulsoryPair => true,
        Operator::ExclusivePair => false,
    }
}

/// Whether the two sides violate `operator`
pub fn is_violation(operator: Operator, left: SideValue, right: SideValue) -> bool {
    match operator {
        Operator::CompulsoryPair => left.is_present() != right.is_present(),
        Operator::ExclusivePair => left.is_present() && right.is_present(),
        _ => match (left.comparable(), right.comparable()) {
            (Some(l), Some(r)) => !holds(operator, l, r),
            _ => false,
        },
    }
}
