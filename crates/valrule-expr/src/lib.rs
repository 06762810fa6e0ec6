//! Validation rule expression language
//!
//! Expressions combine operands (`#{dataElement}`, `#{dataElement.coc}`,
//! `I{indicator}`, `A{program.attribute}`, `D{program.dataElement}`,
//! `C{constant}`, `[days]`) with arithmetic, comparison and logical operators
//! and a small function library (`if`, `isNull`, `isNotNull`, `firstNonNull`,
//! `greatest`, `least`).
//!
//! The [`ExpressionService`] trait is what the validation engine consumes;
//! [`ExpressionEngine`] is the default implementation with a parse cache.

pub mod ast;
pub mod error;
pub mod eval;
pub mod parser;
pub mod service;

pub use ast::{BinaryOp, Expr, Function, UnaryOp};
pub use error::{ExprError, ExprResult};
pub use eval::{ItemCounts, Value};
pub use parser::parse_expression;
pub use service::{EvalScope, ExprOutcome, ExpressionEngine, ExpressionService};
