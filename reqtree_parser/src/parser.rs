//! Textual front end: turns source text in the property language into
//! the concrete AST from `concrete.rs` (§6 "parse(hpl_source: string)").
//!
//! The original evaluator imports a ready-made HPL grammar (`hpl.parser`);
//! no equivalent crate exists in this ecosystem, so the grammar is
//! expressed with `pest`, the way the pack's own grammar-heavy repo
//! (a SysML/KerML front end) expresses its textual languages.

use crate::ast::LiteralValue;
use crate::concrete::{Condition, EventNode, PatternKind, PatternNode, SimpleEvent};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;
use reqtree_core::error::MalformedPattern;
use reqtree_core::ReqError;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct HplParser;

/// Parse one or more pattern clauses out of `source`, in source order.
pub fn parse_source(source: &str) -> Result<Vec<PatternNode>, ReqError> {
    let mut file = HplParser::parse(Rule::file, source)?;
    let file_pair = file.next().expect("Rule::file always produces one pair");

    let mut patterns = Vec::new();
    for pair in file_pair.into_inner() {
        match pair.as_rule() {
            Rule::pattern => patterns.push(parse_pattern(pair)?),
            Rule::EOI => {}
            other => unreachable!("unexpected top-level rule {other:?}"),
        }
    }
    Ok(patterns)
}

fn parse_pattern(pair: Pair<Rule>) -> Result<PatternNode, ReqError> {
    let inner = pair.into_inner().next().expect("pattern wraps exactly one alternative");
    let (kind, expected) = match inner.as_rule() {
        Rule::existence_pattern => (PatternKind::Existence, 1),
        Rule::absence_pattern => (PatternKind::Absence, 1),
        Rule::response_pattern => (PatternKind::Response, 2),
        Rule::requirement_pattern => (PatternKind::Requirement, 2),
        Rule::prevention_pattern => (PatternKind::Prevention, 2),
        other => unreachable!("unexpected pattern alternative {other:?}"),
    };

    let children: Vec<EventNode> = inner
        .into_inner()
        .filter(|p| p.as_rule() == Rule::event)
        .map(parse_event)
        .collect();

    if children.len() != expected {
        return Err(Box::new(MalformedPattern {
            pattern: pattern_name(kind),
            expected,
            got: children.len(),
        }));
    }

    Ok(PatternNode { kind, children })
}

fn pattern_name(kind: PatternKind) -> &'static str {
    match kind {
        PatternKind::Existence => "Existence",
        PatternKind::Absence => "Absence",
        PatternKind::Response => "Response",
        PatternKind::Requirement => "Requirement",
        PatternKind::Prevention => "Prevention",
    }
}

fn parse_event(pair: Pair<Rule>) -> EventNode {
    let simples: Vec<Pair<Rule>> = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::simple_event)
        .collect();
    let mut iter = simples.into_iter();
    let first = EventNode::Simple(parse_simple_event(iter.next().expect("event has at least one simple_event")));
    match iter.next() {
        Some(second) => EventNode::Disjunction(
            Box::new(first),
            Box::new(EventNode::Simple(parse_simple_event(second))),
        ),
        None => first,
    }
}

fn parse_simple_event(pair: Pair<Rule>) -> SimpleEvent {
    let mut inner = pair.into_inner();
    let topic = inner.next().expect("simple_event.topic").as_str().to_string();
    let msg_type = inner.next().expect("simple_event.msg_type").as_str().to_string();
    let condition_pair = inner.next().expect("simple_event.condition");
    SimpleEvent {
        topic,
        msg_type,
        condition: parse_condition(condition_pair),
    }
}

fn parse_condition(pair: Pair<Rule>) -> Condition {
    let mut inner = pair.into_inner();
    let mut acc = parse_term(inner.next().expect("condition has at least one term"));
    loop {
        let Some(op_pair) = inner.next() else { break };
        let op = op_pair.as_str().to_lowercase();
        let rhs_pair = inner.next().expect("bool_op is always followed by a term");
        let rhs = parse_term(rhs_pair);
        acc = Condition::Operator {
            op,
            operand1: Box::new(acc),
            operand2: Box::new(rhs),
        };
    }
    acc
}

fn parse_term(pair: Pair<Rule>) -> Condition {
    let inner = pair.into_inner().next().expect("term wraps exactly one alternative");
    match inner.as_rule() {
        Rule::comparison => parse_comparison(inner),
        Rule::condition => parse_condition(inner),
        other => unreachable!("unexpected term alternative {other:?}"),
    }
}

fn parse_comparison(pair: Pair<Rule>) -> Condition {
    let mut inner = pair.into_inner();
    let operand1 = parse_operand(inner.next().expect("comparison.operand1"));
    let op = inner.next().expect("comparison.cmp_op").as_str().to_string();
    let operand2 = parse_operand(inner.next().expect("comparison.operand2"));
    Condition::Operator {
        op,
        operand1: Box::new(operand1),
        operand2: Box::new(operand2),
    }
}

fn parse_operand(pair: Pair<Rule>) -> Condition {
    let inner = pair.into_inner().next().expect("operand wraps exactly one alternative");
    match inner.as_rule() {
        Rule::float => Condition::Literal(LiteralValue::Float(
            inner.as_str().parse().expect("grammar guarantees a valid float"),
        )),
        Rule::int => Condition::Literal(LiteralValue::Int(
            inner.as_str().parse().expect("grammar guarantees a valid int"),
        )),
        Rule::bool_lit => Condition::Literal(LiteralValue::Bool(
            inner.as_str().eq_ignore_ascii_case("true"),
        )),
        Rule::string => {
            let s = inner.as_str();
            Condition::Literal(LiteralValue::Str(s[1..s.len() - 1].to_string()))
        }
        Rule::field => Condition::Field(inner.as_str().to_string()),
        other => unreachable!("unexpected operand alternative {other:?}"),
    }
}
