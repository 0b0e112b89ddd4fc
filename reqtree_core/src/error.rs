//! Error types.
//!
//! Follows the teacher's convention: a boxed trait-object alias for the
//! common case, with a handful of small named error structs for the kinds
//! a caller may want to match on (construction errors, per §7).

use std::fmt;

/// The error type used throughout the crate.
pub type ReqError = Box<dyn std::error::Error + Send + Sync>;

/// A binary or logical operator token the predicate compiler does not
/// recognize.
#[derive(Debug, Clone)]
pub struct UnsupportedOperator(pub String);

impl fmt::Display for UnsupportedOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported operator {:?}", self.0)
    }
}
impl std::error::Error for UnsupportedOperator {}

/// A pattern was constructed with the wrong number of children (§3
/// invariant 3).
#[derive(Debug, Clone)]
pub struct MalformedPattern {
    pub pattern: &'static str,
    pub expected: usize,
    pub got: usize,
}

impl fmt::Display for MalformedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requires {} children, got {}",
            self.pattern, self.expected, self.got
        )
    }
}
impl std::error::Error for MalformedPattern {}

/// An AST event node was neither a simple event nor a disjunction.
#[derive(Debug, Clone)]
pub struct UnknownEventKind;

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event is neither a simple event nor a disjunction")
    }
}
impl std::error::Error for UnknownEventKind {}
