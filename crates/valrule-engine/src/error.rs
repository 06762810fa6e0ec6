//! Engine errors

use thiserror::Error;
use valrule_expr::ExprError;
use valrule_model::{ModelError, OrgUnitId, RuleId};

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur during a validation run
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    /// A rule expression does not parse or evaluate; fatal for the run
    #[error("Invalid expression in rule {rule}: {source}")]
    Expression {
        rule: RuleId,
        #[source]
        source: ExprError,
    },

    /// Data fetch failed for one org unit; other units are unaffected
    #[error("Data source failed for org unit {org_unit}: {message}")]
    DataSource { org_unit: OrgUnitId, message: String },

    /// The request cannot be turned into a run
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid model value in the request
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl EngineError {
    /// Create an expression error for `rule`
    pub fn expression(rule: &RuleId, source: ExprError) -> Self {
        Self::Expression {
            rule: rule.clone(),
            source,
        }
    }

    /// Create a data source error for `org_unit`
    pub fn data_source(org_unit: &OrgUnitId, message: impl Into<String>) -> Self {
        Self::DataSource {
            org_unit: org_unit.clone(),
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Whether the failure is confined to one org unit
    pub fn is_isolated(&self) -> bool {
        matches!(self, Self::DataSource { .. })
    }
}
