//! Expression syntax tree

use crate::{ExprError, ExprResult};
use valrule_model::Operand;

/// A parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Bool(bool),
    /// Reference to a data element, indicator, attribute or program data element
    Operand(Operand),
    /// `C{id}`
    Constant(String),
    /// `[days]`
    Days,
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Power,
    Multiply,
    Divide,
    Modulus,
    Add,
    Subtract,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Power => "^",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulus => "%",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    If,
    IsNull,
    IsNotNull,
    FirstNonNull,
    Greatest,
    Least,
}

impl Function {
    pub fn name(&self) -> &'static str {
        match self {
            Function::If => "if",
            Function::IsNull => "isNull",
            Function::IsNotNull => "isNotNull",
            Function::FirstNonNull => "firstNonNull",
            Function::Greatest => "greatest",
            Function::Least => "least",
        }
    }

    /// Look up a function by name and check its arity
    pub fn resolve(name: &str, arg_count: usize) -> ExprResult<Self> {
        let function = match name {
            "if" => Function::If,
            "isNull" => Function::IsNull,
            "isNotNull" => Function::IsNotNull,
            "firstNonNull" => Function::FirstNonNull,
            "greatest" => Function::Greatest,
            "least" => Function::Least,
            _ => {
                return Err(ExprError::UnknownFunction {
                    name: name.to_string(),
                });
            }
        };
        let (ok, expected) = match function {
            Function::If => (arg_count == 3, "3"),
            Function::IsNull | Function::IsNotNull => (arg_count == 1, "1"),
            Function::FirstNonNull | Function::Greatest | Function::Least => {
                (arg_count >= 1, "at least 1")
            }
        };
        if !ok {
            return Err(ExprError::ArgumentCount {
                name: name.to_string(),
                expected: expected.to_string(),
                found: arg_count,
            });
        }
        Ok(function)
    }

    /// Functions whose arguments are probed for null instead of read as values
    pub fn probes_null(&self) -> bool {
        matches!(
            self,
            Function::IsNull | Function::IsNotNull | Function::FirstNonNull
        )
    }
}

/// An item referenced by an expression for missing-value accounting
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Item<'a> {
    Operand(&'a Operand),
    Constant(&'a str),
}

impl Expr {
    /// Visit every operand and constant reference together with whether it
    /// sits inside a null-probing function
    pub fn walk_items<'a>(&'a self, visit: &mut impl FnMut(Item<'a>, bool)) {
        self.walk_items_inner(false, visit);
    }

    fn walk_items_inner<'a>(&'a self, in_probe: bool, visit: &mut impl FnMut(Item<'a>, bool)) {
        match self {
            Expr::Number(_) | Expr::Bool(_) | Expr::Days => {}
            Expr::Operand(operand) => visit(Item::Operand(operand), in_probe),
            Expr::Constant(id) => visit(Item::Constant(id), in_probe),
            Expr::Unary { operand, .. } => operand.walk_items_inner(in_probe, visit),
            Expr::Binary { left, right, .. } => {
                left.walk_items_inner(in_probe, visit);
                right.walk_items_inner(in_probe, visit);
            }
            Expr::Call { function, args } => {
                let nested = in_probe || function.probes_null();
                for arg in args {
                    arg.walk_items_inner(nested, visit);
                }
            }
        }
    }

    /// Operands in order of first appearance, without duplicates
    pub fn operands(&self) -> Vec<Operand> {
        let mut out: Vec<Operand> = Vec::new();
        self.walk_items(&mut |item, _| {
            if let Item::Operand(operand) = item {
                if !out.contains(operand) {
                    out.push(operand.clone());
                }
            }
        });
        out
    }
}
