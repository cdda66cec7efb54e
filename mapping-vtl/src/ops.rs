//! Operator semantics for template expressions.
//!
//! Operands are `Option<Value>`: `None` is an unresolved reference, which
//! compares equal to `null` and is falsy.

use std::cmp::Ordering;

use crate::ast::{BinaryOp, UnaryOp};
use crate::value::Value;

pub(crate) fn truthy(value: &Option<Value>) -> bool {
    value.as_ref().is_some_and(Value::is_truthy)
}

pub(crate) fn unary(op: UnaryOp, value: Option<Value>) -> Option<Value> {
    match op {
        UnaryOp::Not => Some(Value::Bool(!truthy(&value))),
        UnaryOp::Neg => match value? {
            Value::Int(i) => Some(i.checked_neg().map_or(Value::Float(-(i as f64)), Value::Int)),
            Value::Float(f) => Some(Value::Float(-f)),
            _ => None,
        },
    }
}

/// The result of `&&` or `||` when the left operand alone decides it, in
/// which case the right operand is not evaluated.
pub(crate) fn short_circuit(op: BinaryOp, lhs: &Option<Value>) -> Option<bool> {
    match op {
        BinaryOp::And if !truthy(lhs) => Some(false),
        BinaryOp::Or if truthy(lhs) => Some(true),
        _ => None,
    }
}

pub(crate) fn binary(op: BinaryOp, lhs: Option<Value>, rhs: Option<Value>) -> Option<Value> {
    match op {
        BinaryOp::Or => Some(Value::Bool(truthy(&lhs) || truthy(&rhs))),
        BinaryOp::And => Some(Value::Bool(truthy(&lhs) && truthy(&rhs))),
        BinaryOp::Eq => Some(Value::Bool(equals(lhs, rhs))),
        BinaryOp::Ne => Some(Value::Bool(!equals(lhs, rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&lhs, &rhs) {
                (Some(a), Some(b)) => order(a, b),
                _ => None,
            };
            let holds = ordering.is_some_and(|o| match op {
                BinaryOp::Lt => o.is_lt(),
                BinaryOp::Le => o.is_le(),
                BinaryOp::Gt => o.is_gt(),
                _ => o.is_ge(),
            });
            Some(Value::Bool(holds))
        }
        BinaryOp::Add => add(lhs?, rhs?),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => arith(op, lhs?, rhs?),
    }
}

fn equals(lhs: Option<Value>, rhs: Option<Value>) -> bool {
    let (a, b) = (lhs.unwrap_or_default(), rhs.unwrap_or_default());
    match (&a, &b) {
        (Value::String(s), n) | (n, Value::String(s)) if n.is_number() => *s == n.to_string(),
        _ => a == b,
    }
}

fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn add(a: Value, b: Value) -> Option<Value> {
    match (&a, &b) {
        (Value::String(_), _) | (_, Value::String(_)) => Some(Value::String(format!("{a}{b}"))),
        (Value::Int(x), Value::Int(y)) => Some(
            x.checked_add(*y)
                .map_or_else(|| Value::Float(*x as f64 + *y as f64), Value::Int),
        ),
        _ => Some(Value::Float(a.as_f64()? + b.as_f64()?)),
    }
}

fn arith(op: BinaryOp, a: Value, b: Value) -> Option<Value> {
    if let (Value::Int(x), Value::Int(y)) = (&a, &b) {
        return int_arith(op, *x, *y);
    }
    let (x, y) = (a.as_f64()?, b.as_f64()?);
    match op {
        BinaryOp::Sub => Some(Value::Float(x - y)),
        BinaryOp::Mul => Some(Value::Float(x * y)),
        BinaryOp::Div => (y != 0.0).then(|| Value::Float(x / y)),
        BinaryOp::Rem => (y != 0.0).then(|| Value::Float(x % y)),
        _ => None,
    }
}

fn int_arith(op: BinaryOp, x: i64, y: i64) -> Option<Value> {
    match op {
        BinaryOp::Sub => Some(
            x.checked_sub(y)
                .map_or_else(|| Value::Float(x as f64 - y as f64), Value::Int),
        ),
        BinaryOp::Mul => Some(
            x.checked_mul(y)
                .map_or_else(|| Value::Float(x as f64 * y as f64), Value::Int),
        ),
        BinaryOp::Div => match x.checked_rem(y) {
            None => None,
            Some(0) => x.checked_div(y).map(Value::Int),
            Some(_) => Some(Value::Float(x as f64 / y as f64)),
        },
        BinaryOp::Rem => x.checked_rem(y).map(Value::Int),
        _ => None,
    }
}
