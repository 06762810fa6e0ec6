//! Expression errors

use thiserror::Error;

/// Result type for expression operations
pub type ExprResult<T> = Result<T, ExprError>;

/// Errors raised while parsing or evaluating an expression
///
/// Any of these means the rule definition itself is broken.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExprError {
    /// Text is not a valid expression
    #[error("Parse error at offset {offset} in {expression:?}")]
    Parse { expression: String, offset: usize },

    /// Function name not in the function library
    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    /// Function called with the wrong number of arguments
    #[error("Function {name} expects {expected} argument(s), found {found}")]
    ArgumentCount {
        name: String,
        expected: String,
        found: usize,
    },

    /// Operand of the wrong kind for an operator
    #[error("Type error in {operation}: expected {expected}, found {found}")]
    Type {
        operation: String,
        expected: String,
        found: String,
    },
}

impl ExprError {
    /// Create a parse error
    pub fn parse(expression: impl Into<String>, offset: usize) -> Self {
        Self::Parse {
            expression: expression.into(),
            offset,
        }
    }

    /// Create a type error
    pub fn type_error(
        operation: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::Type {
            operation: operation.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}
