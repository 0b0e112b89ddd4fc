//! Concrete AST node types produced by the textual front end
//! (`parser.rs`), wired into the traits from `ast.rs` so the same
//! predicate compiler and requirement parser that consume an arbitrary
//! front end also consume this one.

use crate::ast::{
    EventAst, EventDisjunctionAst, FieldAccessAst, LiteralAst, LiteralValue, OperandAst,
    OperatorAst, PatternAst, SimpleEventAst,
};

#[derive(Debug, Clone)]
pub enum Condition {
    Operator {
        op: String,
        operand1: Box<Condition>,
        operand2: Box<Condition>,
    },
    Field(String),
    Literal(LiteralValue),
}

impl OperandAst for Condition {
    fn as_operator(&self) -> Option<&dyn OperatorAst> {
        matches!(self, Condition::Operator { .. }).then_some(self as &dyn OperatorAst)
    }
    fn as_field_access(&self) -> Option<&dyn FieldAccessAst> {
        matches!(self, Condition::Field(_)).then_some(self as &dyn FieldAccessAst)
    }
    fn as_literal(&self) -> Option<&dyn LiteralAst> {
        matches!(self, Condition::Literal(_)).then_some(self as &dyn LiteralAst)
    }
}

impl OperatorAst for Condition {
    fn op(&self) -> &str {
        match self {
            Condition::Operator { op, .. } => op,
            _ => unreachable!("op() called on a non-operator Condition"),
        }
    }
    fn operand1(&self) -> &dyn OperandAst {
        match self {
            Condition::Operator { operand1, .. } => operand1.as_ref(),
            _ => unreachable!("operand1() called on a non-operator Condition"),
        }
    }
    fn operand2(&self) -> &dyn OperandAst {
        match self {
            Condition::Operator { operand2, .. } => operand2.as_ref(),
            _ => unreachable!("operand2() called on a non-operator Condition"),
        }
    }
}

impl FieldAccessAst for Condition {
    fn field_value(&self) -> &str {
        match self {
            Condition::Field(name) => name,
            _ => unreachable!("field_value() called on a non-field Condition"),
        }
    }
}

impl LiteralAst for Condition {
    fn value(&self) -> Option<LiteralValue> {
        match self {
            Condition::Literal(v) => Some(v.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimpleEvent {
    pub topic: String,
    pub msg_type: String,
    pub condition: Condition,
}

impl SimpleEventAst for SimpleEvent {
    fn topic(&self) -> &str {
        &self.topic
    }
    fn msg_type(&self) -> &str {
        &self.msg_type
    }
    fn condition(&self) -> &dyn OperandAst {
        &self.condition
    }
}

#[derive(Debug, Clone)]
pub enum EventNode {
    Simple(SimpleEvent),
    Disjunction(Box<EventNode>, Box<EventNode>),
}

impl EventAst for EventNode {
    fn as_simple_event(&self) -> Option<&dyn SimpleEventAst> {
        match self {
            EventNode::Simple(e) => Some(e),
            EventNode::Disjunction(..) => None,
        }
    }
    fn as_disjunction(&self) -> Option<&dyn EventDisjunctionAst> {
        matches!(self, EventNode::Disjunction(..)).then_some(self as &dyn EventDisjunctionAst)
    }
}

impl EventDisjunctionAst for EventNode {
    fn event1(&self) -> &dyn EventAst {
        match self {
            EventNode::Disjunction(a, _) => a.as_ref(),
            _ => unreachable!("event1() called on a non-disjunction EventNode"),
        }
    }
    fn event2(&self) -> &dyn EventAst {
        match self {
            EventNode::Disjunction(_, b) => b.as_ref(),
            _ => unreachable!("event2() called on a non-disjunction EventNode"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Existence,
    Absence,
    Response,
    Requirement,
    Prevention,
}

#[derive(Debug, Clone)]
pub struct PatternNode {
    pub kind: PatternKind,
    pub children: Vec<EventNode>,
}

impl PatternAst for PatternNode {
    fn is_existence(&self) -> bool {
        self.kind == PatternKind::Existence
    }
    fn is_absence(&self) -> bool {
        self.kind == PatternKind::Absence
    }
    fn is_response(&self) -> bool {
        self.kind == PatternKind::Response
    }
    fn is_requirement(&self) -> bool {
        self.kind == PatternKind::Requirement
    }
    fn is_prevention(&self) -> bool {
        self.kind == PatternKind::Prevention
    }
    fn children(&self) -> Vec<&dyn EventAst> {
        self.children.iter().map(|e| e as &dyn EventAst).collect()
    }
}
