//! Expression parser using precedence climbing over winnow combinators
//!
//! Precedence, loosest first: `||`, `&&`, `==` `!=`, `<` `<=` `>` `>=`,
//! `+` `-`, `*` `/` `%`, unary `-` `+` `!`, `^` (right associative).

use crate::ast::{BinaryOp, Expr, Function, UnaryOp};
use crate::{ExprError, ExprResult};
use valrule_model::Operand;
use winnow::ascii::multispace0;
use winnow::combinator::{cut_err, empty, separated, terminated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

type Input<'a> = &'a str;
type PResult<T> = Result<T, ErrMode<ContextError>>;

/// Parse a complete expression
pub fn parse_expression(text: &str) -> ExprResult<Expr> {
    let mut input = text;
    let parsed = ws
        .parse_next(&mut input)
        .and_then(|()| expression(&mut input))
        .and_then(|expr| ws.parse_next(&mut input).map(|()| expr));
    let offset = text.len() - input.len();
    match parsed {
        Ok(expr) if input.is_empty() => Ok(expr),
        Ok(_) => Err(ExprError::parse(text, offset)),
        Err(ErrMode::Backtrack(err) | ErrMode::Cut(err)) => Err(err
            .cause()
            .and_then(|cause| cause.downcast_ref::<ExprError>())
            .cloned()
            .unwrap_or_else(|| ExprError::parse(text, offset))),
        Err(ErrMode::Incomplete(_)) => Err(ExprError::parse(text, offset)),
    }
}

fn ws(input: &mut Input<'_>) -> PResult<()> {
    multispace0.void().parse_next(input)
}

fn lit<'a>(token: &'static str) -> impl Parser<Input<'a>, &'a str, ErrMode<ContextError>> {
    literal(token)
}

fn comma(input: &mut Input<'_>) -> PResult<()> {
    (ws, lit(","), ws).void().parse_next(input)
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn expression(input: &mut Input<'_>) -> PResult<Expr> {
    ws.parse_next(input)?;
    or_expression(input)
}

fn or_expression(input: &mut Input<'_>) -> PResult<Expr> {
    let mut left = and_expression(input)?;
    loop {
        ws.parse_next(input)?;
        if lit("||").parse_next(input).is_err() {
            break;
        }
        ws.parse_next(input)?;
        let right = and_expression(input)?;
        left = binary(left, BinaryOp::Or, right);
    }
    Ok(left)
}

fn and_expression(input: &mut Input<'_>) -> PResult<Expr> {
    let mut left = equality_expression(input)?;
    loop {
        ws.parse_next(input)?;
        if lit("&&").parse_next(input).is_err() {
            break;
        }
        ws.parse_next(input)?;
        let right = equality_expression(input)?;
        left = binary(left, BinaryOp::And, right);
    }
    Ok(left)
}

fn equality_expression(input: &mut Input<'_>) -> PResult<Expr> {
    let mut left = comparison_expression(input)?;
    loop {
        ws.parse_next(input)?;
        let op = if lit("==").parse_next(input).is_ok() {
            BinaryOp::Equal
        } else if lit("!=").parse_next(input).is_ok() {
            BinaryOp::NotEqual
        } else {
            break;
        };
        ws.parse_next(input)?;
        let right = comparison_expression(input)?;
        left = binary(left, op, right);
    }
    Ok(left)
}

fn comparison_expression(input: &mut Input<'_>) -> PResult<Expr> {
    let mut left = additive_expression(input)?;
    loop {
        ws.parse_next(input)?;
        let op = if lit("<=").parse_next(input).is_ok() {
            BinaryOp::LessOrEqual
        } else if lit(">=").parse_next(input).is_ok() {
            BinaryOp::GreaterOrEqual
        } else if lit("<").parse_next(input).is_ok() {
            BinaryOp::Less
        } else if lit(">").parse_next(input).is_ok() {
            BinaryOp::Greater
        } else {
            break;
        };
        ws.parse_next(input)?;
        let right = additive_expression(input)?;
        left = binary(left, op, right);
    }
    Ok(left)
}

fn additive_expression(input: &mut Input<'_>) -> PResult<Expr> {
    let mut left = multiplicative_expression(input)?;
    loop {
        ws.parse_next(input)?;
        let op = if lit("+").parse_next(input).is_ok() {
            BinaryOp::Add
        } else if lit("-").parse_next(input).is_ok() {
            BinaryOp::Subtract
        } else {
            break;
        };
        ws.parse_next(input)?;
        let right = multiplicative_expression(input)?;
        left = binary(left, op, right);
    }
    Ok(left)
}

fn multiplicative_expression(input: &mut Input<'_>) -> PResult<Expr> {
    let mut left = unary_expression(input)?;
    loop {
        ws.parse_next(input)?;
        let op = if lit("*").parse_next(input).is_ok() {
            BinaryOp::Multiply
        } else if lit("/").parse_next(input).is_ok() {
            BinaryOp::Divide
        } else if lit("%").parse_next(input).is_ok() {
            BinaryOp::Modulus
        } else {
            break;
        };
        ws.parse_next(input)?;
        let right = unary_expression(input)?;
        left = binary(left, op, right);
    }
    Ok(left)
}

fn unary_expression(input: &mut Input<'_>) -> PResult<Expr> {
    let op = if lit("-").parse_next(input).is_ok() {
        Some(UnaryOp::Negate)
    } else if lit("+").parse_next(input).is_ok() {
        Some(UnaryOp::Plus)
    } else if lit("!").parse_next(input).is_ok() {
        Some(UnaryOp::Not)
    } else {
        None
    };
    match op {
        Some(op) => {
            ws.parse_next(input)?;
            let operand = unary_expression(input)?;
            Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            })
        }
        None => power_expression(input),
    }
}

/// Right associative: the exponent may itself be a unary or power expression
fn power_expression(input: &mut Input<'_>) -> PResult<Expr> {
    let base = primary_expression(input)?;
    let checkpoint = *input;
    ws.parse_next(input)?;
    if lit("^").parse_next(input).is_err() {
        *input = checkpoint;
        return Ok(base);
    }
    ws.parse_next(input)?;
    let exponent = unary_expression(input)?;
    Ok(binary(base, BinaryOp::Power, exponent))
}

fn primary_expression(input: &mut Input<'_>) -> PResult<Expr> {
    if lit("(").parse_next(input).is_ok() {
        let inner = cut_err(terminated(expression, (ws, lit(")")))).parse_next(input)?;
        return Ok(inner);
    }
    if lit("[days]").parse_next(input).is_ok() {
        return Ok(Expr::Days);
    }
    if let Some(body) = braced(input, "#{")? {
        return Ok(Expr::Operand(data_element_operand(body)));
    }
    if let Some(body) = braced(input, "I{")? {
        return Ok(Expr::Operand(Operand::ProgramIndicator {
            indicator: body.to_string(),
        }));
    }
    if let Some(body) = braced(input, "A{")? {
        let (program, attribute) = match body.split_once('.') {
            Some((program, attribute)) => (Some(program.to_string()), attribute),
            None => (None, body),
        };
        return Ok(Expr::Operand(Operand::Attribute {
            program,
            attribute: attribute.to_string(),
        }));
    }
    if let Some(body) = braced(input, "D{")? {
        let Some((program, data_element)) = body.split_once('.') else {
            return Err(ErrMode::Cut(ContextError::new()));
        };
        return Ok(Expr::Operand(Operand::ProgramDataElement {
            program: program.to_string(),
            data_element: data_element.to_string(),
        }));
    }
    if let Some(body) = braced(input, "C{")? {
        return Ok(Expr::Constant(body.to_string()));
    }
    if input.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return number(input);
    }
    call_or_keyword(input)
}

/// `prefix` followed by a non-empty body and `}`
fn braced<'a>(input: &mut Input<'a>, prefix: &'static str) -> PResult<Option<&'a str>> {
    if lit(prefix).parse_next(input).is_err() {
        return Ok(None);
    }
    let body = cut_err(terminated(take_while(1.., |c: char| c != '}'), lit("}")))
        .parse_next(input)?;
    let body = body.trim();
    if body.is_empty() {
        return Err(ErrMode::Cut(ContextError::new()));
    }
    Ok(Some(body))
}

fn data_element_operand(body: &str) -> Operand {
    match body.split_once('.') {
        Some((data_element, coc)) => Operand::combo(data_element.trim(), coc.trim()),
        None => Operand::total(body),
    }
}

fn number(input: &mut Input<'_>) -> PResult<Expr> {
    take_while(1.., |c: char| c.is_ascii_digit() || c == '.')
        .try_map(|digits: &str| digits.parse::<f64>())
        .map(Expr::Number)
        .parse_next(input)
}

fn identifier<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

fn call_or_keyword(input: &mut Input<'_>) -> PResult<Expr> {
    let name = identifier(input)?;
    ws.parse_next(input)?;
    if lit("(").parse_next(input).is_err() {
        return match name {
            "true" => Ok(Expr::Bool(true)),
            "false" => Ok(Expr::Bool(false)),
            _ => Err(ErrMode::Backtrack(ContextError::new())),
        };
    }
    ws.parse_next(input)?;
    let args: Vec<Expr> =
        cut_err(terminated(separated(0.., expression, comma), (ws, lit(")")))).parse_next(input)?;
    let function = cut_err(empty.try_map(|()| Function::resolve(name, args.len())))
        .parse_next(input)?;
    Ok(Expr::Call { function, args })
}
