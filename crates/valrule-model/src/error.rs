//! Errors raised while constructing model values

use thiserror::Error;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur when building model values from external input
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Identifier is empty or whitespace
    #[error("Invalid identifier: {0:?}")]
    InvalidId(String),

    /// Period identifier does not follow any supported ISO format
    #[error("Invalid period identifier: {0}")]
    InvalidPeriod(String),

    /// Date range whose start is after its end
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: String, end: String },

    /// Operator name not in the operator table
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),
}

impl ModelError {
    /// Create an invalid period error
    pub fn invalid_period(id: impl Into<String>) -> Self {
        Self::InvalidPeriod(id.into())
    }
}
