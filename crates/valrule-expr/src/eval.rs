//! Expression evaluation and missing-value accounting

use crate::ast::{BinaryOp, Expr, Function, Item, UnaryOp};
use crate::service::EvalScope;
use crate::{ExprError, ExprResult};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use valrule_model::MissingValueStrategy;

/// Intermediate value of an expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Bool(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
        }
    }

    /// Final numeric reading: booleans count as 1 or 0
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        }
    }
}

/// How many distinct items an expression reads and how many have no value
///
/// Items inside `isNull`, `isNotNull` and `firstNonNull` are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemCounts {
    pub items: usize,
    pub missing: usize,
}

impl ItemCounts {
    pub fn of(expr: &Expr, scope: &EvalScope<'_>) -> Self {
        let mut seen = BTreeSet::new();
        let mut counts = ItemCounts::default();
        expr.walk_items(&mut |item, in_probe| {
            if in_probe || !seen.insert(item.clone()) {
                return;
            }
            counts.items += 1;
            let present = match item {
                Item::Operand(operand) => scope.values.contains_key(operand),
                Item::Constant(id) => scope.constants.contains_key(id),
            };
            if !present {
                counts.missing += 1;
            }
        });
        counts
    }

    /// Whether `strategy` turns these counts into a skip
    pub fn should_skip(&self, strategy: MissingValueStrategy) -> bool {
        match strategy {
            MissingValueStrategy::NeverSkip => false,
            MissingValueStrategy::SkipIfAnyValueMissing => self.missing > 0,
            MissingValueStrategy::SkipIfAllValuesMissing => {
                self.items > 0 && self.missing == self.items
            }
        }
    }
}

/// Evaluate `expr`; missing items read as zero outside null probes
pub fn evaluate(expr: &Expr, scope: &EvalScope<'_>) -> ExprResult<Value> {
    eval(expr, scope, false)
}

fn resolve(value: Option<f64>, in_probe: bool) -> Value {
    match value {
        Some(n) => Value::Number(n),
        None if in_probe => Value::Null,
        None => Value::Number(0.0),
    }
}

fn eval(expr: &Expr, scope: &EvalScope<'_>, in_probe: bool) -> ExprResult<Value> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Days => Ok(Value::Number(f64::from(scope.days))),
        Expr::Operand(operand) => Ok(resolve(scope.values.get(operand).copied(), in_probe)),
        Expr::Constant(id) => Ok(resolve(scope.constants.get(id).copied(), in_probe)),
        Expr::Unary { op, operand } => {
            let value = eval(operand, scope, in_probe)?;
            match (op, value) {
                (_, Value::Null) => Ok(Value::Null),
                (UnaryOp::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
                (UnaryOp::Plus, Value::Number(n)) => Ok(Value::Number(n)),
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOp::Not, other) => Err(ExprError::type_error("!", "boolean", other.type_name())),
                (_, other) => Err(ExprError::type_error("unary sign", "number", other.type_name())),
            }
        }
        Expr::Binary { left, op, right } => {
            let left = eval(left, scope, in_probe)?;
            let right = eval(right, scope, in_probe)?;
            apply_binary(*op, left, right)
        }
        Expr::Call { function, args } => call(*function, args, scope, in_probe),
    }
}

fn apply_binary(op: BinaryOp, left: Value, right: Value) -> ExprResult<Value> {
    use Value::{Bool, Null, Number};

    let mismatch = |expected: &str, found: Value| -> ExprResult<Value> {
        Err(ExprError::type_error(op.symbol(), expected, found.type_name()))
    };
    match (op, left, right) {
        (_, Null, _) | (_, _, Null) => Ok(Null),
        (BinaryOp::And, Bool(a), Bool(b)) => Ok(Bool(a && b)),
        (BinaryOp::Or, Bool(a), Bool(b)) => Ok(Bool(a || b)),
        (BinaryOp::And | BinaryOp::Or, Bool(_), other) | (BinaryOp::And | BinaryOp::Or, other, _) => {
            mismatch("boolean", other)
        }
        (BinaryOp::Equal, Bool(a), Bool(b)) => Ok(Bool(a == b)),
        (BinaryOp::NotEqual, Bool(a), Bool(b)) => Ok(Bool(a != b)),
        (_, Number(a), Number(b)) => numeric(op, a, b)
            .ok_or_else(|| ExprError::type_error(op.symbol(), "boolean", "number")),
        (_, Number(_), other) | (_, other, _) => mismatch("number", other),
    }
}

fn numeric(op: BinaryOp, a: f64, b: f64) -> Option<Value> {
    let value = match op {
        BinaryOp::Power => Value::Number(a.powf(b)),
        BinaryOp::Multiply => Value::Number(a * b),
        BinaryOp::Divide => Value::Number(a / b),
        BinaryOp::Modulus => Value::Number(a % b),
        BinaryOp::Add => Value::Number(a + b),
        BinaryOp::Subtract => Value::Number(a - b),
        BinaryOp::Less => Value::Bool(a < b),
        BinaryOp::LessOrEqual => Value::Bool(a <= b),
        BinaryOp::Greater => Value::Bool(a > b),
        BinaryOp::GreaterOrEqual => Value::Bool(a >= b),
        BinaryOp::Equal => Value::Bool(a == b),
        BinaryOp::NotEqual => Value::Bool(a != b),
        BinaryOp::And | BinaryOp::Or => return None,
    };
    Some(value)
}

fn call(
    function: Function,
    args: &[Expr],
    scope: &EvalScope<'_>,
    in_probe: bool,
) -> ExprResult<Value> {
    match function {
        Function::If => {
            let [condition, then, otherwise] = args else {
                return Err(ExprError::ArgumentCount {
                    name: function.name().to_string(),
                    expected: "3".to_string(),
                    found: args.len(),
                });
            };
            match eval(condition, scope, in_probe)? {
                Value::Bool(true) => eval(then, scope, in_probe),
                Value::Bool(false) | Value::Null => eval(otherwise, scope, in_probe),
                other => Err(ExprError::type_error("if", "boolean", other.type_name())),
            }
        }
        Function::IsNull | Function::IsNotNull => {
            let is_null = match args.first() {
                Some(arg) => eval(arg, scope, true)? == Value::Null,
                None => true,
            };
            Ok(Value::Bool(is_null == (function == Function::IsNull)))
        }
        Function::FirstNonNull => {
            for arg in args {
                let value = eval(arg, scope, true)?;
                if value != Value::Null {
                    return Ok(value);
                }
            }
            Ok(Value::Null)
        }
        Function::Greatest | Function::Least => {
            let mut numbers: SmallVec<[f64; 4]> = SmallVec::new();
            for arg in args {
                match eval(arg, scope, in_probe)? {
                    Value::Null => {}
                    Value::Number(n) => numbers.push(n),
                    other => {
                        return Err(ExprError::type_error(function.name(), "number", other.type_name()));
                    }
                }
            }
            let pick = if function == Function::Greatest {
                f64::max
            } else {
                f64::min
            };
            Ok(numbers
                .into_iter()
                .reduce(pick)
                .map_or(Value::Null, Value::Number))
        }
    }
}
