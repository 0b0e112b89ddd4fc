//! Predicate compiler (§4.1).
//!
//! Grounded on `rigelcore/simulations/callback.py`'s `CallbackGenerator`:
//! each comparison operator becomes a closure comparing a named field
//! against a constant, and `and` short-circuits two sub-predicates.
//!
//! The source compiles `iff` and `implies` with the same branch and
//! swapped arguments, which collapses `implies` into `iff` and is
//! almost certainly a bug (§9 open question). This compiler gives them
//! the standard, distinct readings: `implies(a, b) = ¬a ∨ b`,
//! `iff(a, b) = a == b`.

use crate::ast::{LiteralValue, OperandAst};
use reqtree_core::error::UnsupportedOperator;
use reqtree_core::message::{Message, Value};
use reqtree_core::nodes::Predicate;
use std::sync::Arc;

/// An operand reduces to either a constant or a nested predicate.
enum Operand {
    Field(String),
    Literal(Value),
    Predicate(Predicate),
}

impl Operand {
    fn resolve(&self, msg: &Message) -> Option<Value> {
        match self {
            Operand::Field(name) => msg.get(name).cloned(),
            Operand::Literal(v) => Some(v.clone()),
            Operand::Predicate(p) => Some(Value::Bool(p(msg))),
        }
    }
}

fn literal_to_value(v: &LiteralValue) -> Value {
    match v {
        LiteralValue::Bool(b) => Value::Bool(*b),
        LiteralValue::Int(i) => Value::Int(*i),
        LiteralValue::Float(f) => Value::Float(*f),
        LiteralValue::Str(s) => Value::Str(s.clone()),
    }
}

/// Reduce an operand AST node to a field name, constant, or compiled
/// sub-predicate (§4.1 "Literal extraction").
fn extract_operand(node: &dyn OperandAst) -> Result<Operand, UnsupportedOperator> {
    if let Some(field) = node.as_field_access() {
        return Ok(Operand::Field(field.field_value().to_string()));
    }
    if let Some(lit) = node.as_literal() {
        let value = lit
            .value()
            .ok_or_else(|| UnsupportedOperator("literal with no value".to_string()))?;
        return Ok(Operand::Literal(literal_to_value(&value)));
    }
    if let Some(op) = node.as_operator() {
        let predicate = compile_operator(op)?;
        return Ok(Operand::Predicate(predicate));
    }
    Err(UnsupportedOperator("operand is neither field, literal, nor operator".to_string()))
}

fn compile_operator(op: &dyn crate::ast::OperatorAst) -> Result<Predicate, UnsupportedOperator> {
    let arg1 = extract_operand(op.operand1())?;
    let arg2 = extract_operand(op.operand2())?;

    match op.op() {
        "=" => Ok(comparison(arg1, arg2, |ord| ord == std::cmp::Ordering::Equal)),
        "!=" | "≠" => Ok(comparison(arg1, arg2, |ord| ord != std::cmp::Ordering::Equal)),
        "<" => Ok(comparison(arg1, arg2, |ord| ord == std::cmp::Ordering::Less)),
        "<=" | "≤" => Ok(comparison(arg1, arg2, |ord| ord != std::cmp::Ordering::Greater)),
        ">" => Ok(comparison(arg1, arg2, |ord| ord == std::cmp::Ordering::Greater)),
        ">=" | "≥" => Ok(comparison(arg1, arg2, |ord| ord != std::cmp::Ordering::Less)),
        "and" => Ok(conjunction(arg1, arg2)),
        "implies" => Ok(implies(arg1, arg2)),
        "iff" => Ok(iff(arg1, arg2)),
        other => Err(UnsupportedOperator(other.to_string())),
    }
}

/// `=`, `<`, `<=`, `>`, `>=` all reduce to a predicate on
/// `Value::partial_cmp`, which already returns `None` (predicate fails)
/// for incompatible types (§4.1).
fn comparison(
    lhs: Operand,
    rhs: Operand,
    accept: impl Fn(std::cmp::Ordering) -> bool + Send + Sync + 'static,
) -> Predicate {
    Arc::new(move |msg: &Message| {
        let (Some(a), Some(b)) = (lhs.resolve(msg), rhs.resolve(msg)) else {
            return false;
        };
        a.partial_cmp(&b).is_some_and(&accept)
    })
}

fn conjunction(lhs: Operand, rhs: Operand) -> Predicate {
    Arc::new(move |msg: &Message| {
        matches!(lhs.resolve(msg), Some(Value::Bool(true)))
            && matches!(rhs.resolve(msg), Some(Value::Bool(true)))
    })
}

/// `implies(a, b) = ¬a ∨ b`.
fn implies(lhs: Operand, rhs: Operand) -> Predicate {
    Arc::new(move |msg: &Message| {
        let a = matches!(lhs.resolve(msg), Some(Value::Bool(true)));
        if !a {
            return true;
        }
        matches!(rhs.resolve(msg), Some(Value::Bool(true)))
    })
}

/// `iff(a, b) = a == b`.
fn iff(lhs: Operand, rhs: Operand) -> Predicate {
    Arc::new(move |msg: &Message| {
        let a = matches!(lhs.resolve(msg), Some(Value::Bool(true)));
        let b = matches!(rhs.resolve(msg), Some(Value::Bool(true)));
        a == b
    })
}

/// Compile a predicate-condition AST node into a closure over a
/// decoded message (§4.1). The entry point is always a binary
/// operator; a bare field access or literal at top level is malformed.
pub fn compile_predicate(node: &dyn OperandAst) -> Result<Predicate, UnsupportedOperator> {
    if let Some(op) = node.as_operator() {
        return compile_operator(op);
    }
    Err(UnsupportedOperator(
        "predicate condition must be a binary operator".to_string(),
    ))
}
