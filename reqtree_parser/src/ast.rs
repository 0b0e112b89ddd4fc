//! The external AST interface consumed by this crate (§6).
//!
//! This module does not parse anything itself: it names the shape a
//! property-language front end must hand back. The rest of this crate
//! (the predicate compiler and the requirement parser) is generic over
//! these traits, so swapping in a real HPL grammar later only means
//! implementing them, not touching `compile.rs` or `build.rs`.

/// A literal value as produced by the property parser. Numeric
/// primitives and booleans come through as-is; strings are unwrapped
/// from their own wrapper (`value.value`), matching the asymmetry
/// called out in §4.1.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// One operand of a binary operator: either a nested operator, a field
/// access, or a literal.
pub trait OperandAst {
    fn as_operator(&self) -> Option<&dyn OperatorAst>;
    fn as_field_access(&self) -> Option<&dyn FieldAccessAst>;
    fn as_literal(&self) -> Option<&dyn LiteralAst>;
}

/// A binary (or `and`) operator node: `op(operand1, operand2)`.
pub trait OperatorAst: OperandAst {
    fn op(&self) -> &str;
    fn operand1(&self) -> &dyn OperandAst;
    fn operand2(&self) -> &dyn OperandAst;
}

/// `field.value` access against the decoded message.
pub trait FieldAccessAst: OperandAst {
    fn field_value(&self) -> &str;
}

/// A literal operand. `value()` holds primitives directly; string
/// literals are reached through the nested `value.value` wrapper
/// (`string_value()`), mirroring the source AST's asymmetric shape.
pub trait LiteralAst: OperandAst {
    fn value(&self) -> Option<LiteralValue>;
}

/// A single topic subscription: `topic.value`, `msg_type.value`,
/// `predicate.condition`.
pub trait SimpleEventAst {
    fn topic(&self) -> &str;
    fn msg_type(&self) -> &str;
    fn condition(&self) -> &dyn OperandAst;
}

/// An `event1 | event2` disjunction of sub-events.
pub trait EventDisjunctionAst {
    fn event1(&self) -> &dyn EventAst;
    fn event2(&self) -> &dyn EventAst;
}

/// An event descendant of a pattern: either a simple event or a
/// disjunction of sub-events (§4.2).
pub trait EventAst {
    fn as_simple_event(&self) -> Option<&dyn SimpleEventAst>;
    fn as_disjunction(&self) -> Option<&dyn EventDisjunctionAst>;
}

/// A top-level pattern node: exactly one of the five discriminants is
/// true, and `children()` yields its event descendants in order
/// (anterior before posterior where the pattern is ordered).
pub trait PatternAst {
    fn is_existence(&self) -> bool;
    fn is_absence(&self) -> bool;
    fn is_response(&self) -> bool;
    fn is_requirement(&self) -> bool;
    fn is_prevention(&self) -> bool;
    fn children(&self) -> Vec<&dyn EventAst>;
}
