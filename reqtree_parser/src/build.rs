//! Requirement parser (§4.2).
//!
//! Grounded on `rigelcore/simulations/parser.py`'s
//! `SimulationRequirementsVisitor`/`SimulationRequirementsParser`: walk a
//! parsed property AST, instantiate one pattern node per top-level
//! `PatternAst`, and recursively turn its event descendants into
//! `Simple` leaves or `Disjoint` combinators.

use crate::ast::{EventAst, PatternAst};
use crate::compile::compile_predicate;
use reqtree_core::error::{MalformedPattern, UnknownEventKind};
use reqtree_core::nodes::{
    AbsenceState, DisjointState, ExistenceState, NodeKind, PreventionState, RequirementState,
    ResponseState, SimpleState,
};
use reqtree_core::{NodeId, ReqError, TreeBuilder};
use std::time::Duration;

/// Per-pattern timeout configuration; the AST interface (§6) carries no
/// timing information of its own, so callers supply it alongside the
/// parsed tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternTimeouts {
    pub timeout: Option<Duration>,
}

fn build_event(
    builder: &mut TreeBuilder,
    event: &dyn EventAst,
) -> Result<NodeId, ReqError> {
    if let Some(simple) = event.as_simple_event() {
        let predicate = compile_predicate(simple.condition())?;
        let id = builder.add_node(NodeKind::Simple(SimpleState::new(
            simple.topic().to_string(),
            simple.msg_type().to_string(),
            predicate,
        )));
        return Ok(id);
    }
    if let Some(disjunction) = event.as_disjunction() {
        let child1 = build_event(builder, disjunction.event1())?;
        let child2 = build_event(builder, disjunction.event2())?;
        let id = builder.add_node(NodeKind::Disjoint(DisjointState::new()));
        builder.set_children(id, vec![child1, child2])?;
        return Ok(id);
    }
    Err(Box::new(UnknownEventKind))
}

/// Build one requirement subtree from a single top-level `PatternAst`,
/// returning its root id. The caller attaches the root to a
/// `ManagerBuilder` via `add_child`.
pub fn build_pattern(
    builder: &mut TreeBuilder,
    pattern: &dyn PatternAst,
    timeouts: PatternTimeouts,
) -> Result<NodeId, ReqError> {
    let children: Vec<&dyn EventAst> = pattern.children();

    let kind_flags = [
        pattern.is_existence(),
        pattern.is_absence(),
        pattern.is_response(),
        pattern.is_requirement(),
        pattern.is_prevention(),
    ];
    if kind_flags.iter().filter(|b| **b).count() != 1 {
        return Err(Box::new(MalformedPattern {
            pattern: "pattern",
            expected: 1,
            got: kind_flags.iter().filter(|b| **b).count(),
        }));
    }

    if pattern.is_existence() || pattern.is_absence() {
        if children.len() != 1 {
            return Err(Box::new(MalformedPattern {
                pattern: if pattern.is_existence() { "Existence" } else { "Absence" },
                expected: 1,
                got: children.len(),
            }));
        }
        let child = build_event(builder, children[0])?;
        let kind = if pattern.is_existence() {
            NodeKind::Existence(ExistenceState::new(timeouts.timeout))
        } else {
            NodeKind::Absence(AbsenceState::new(timeouts.timeout))
        };
        let id = builder.add_node(kind);
        builder.set_children(id, vec![child])?;
        return Ok(id);
    }

    // Response, Requirement, and Prevention all take two ordered event
    // children: anterior (index 0), posterior (index 1) in the AST's own
    // traversal order. Requirement alone stores them reversed internally
    // (§4.8); that reversal happens in `set_children`'s ordering below,
    // not here, so the AST's `children()` order stays the natural one.
    if children.len() != 2 {
        let name = if pattern.is_response() {
            "Response"
        } else if pattern.is_requirement() {
            "Requirement"
        } else {
            "Prevention"
        };
        return Err(Box::new(MalformedPattern {
            pattern: name,
            expected: 2,
            got: children.len(),
        }));
    }
    let anterior = build_event(builder, children[0])?;
    let posterior = build_event(builder, children[1])?;

    if pattern.is_response() {
        let id = builder.add_node(NodeKind::Response(ResponseState::new(timeouts.timeout)));
        builder.set_children(id, vec![anterior, posterior])?;
        Ok(id)
    } else if pattern.is_requirement() {
        let id = builder.add_node(NodeKind::Requirement(RequirementState::new(timeouts.timeout)));
        // §4.8: indices reversed, children[0] = posterior, children[1] = anterior.
        builder.set_children(id, vec![posterior, anterior])?;
        Ok(id)
    } else {
        let id = builder.add_node(NodeKind::Prevention(PreventionState::new(timeouts.timeout)));
        builder.set_children(id, vec![anterior, posterior])?;
        Ok(id)
    }
}

/// Build a tree for every top-level pattern in `patterns`, each given
/// the same timeout configuration. Mirrors
/// `SimulationRequirementsParser.parse`'s return of one tree per
/// pattern found while walking the AST.
pub fn build_patterns(
    builder: &mut TreeBuilder,
    patterns: &[&dyn PatternAst],
    timeouts: PatternTimeouts,
) -> Result<Vec<NodeId>, ReqError> {
    patterns
        .iter()
        .map(|pattern| build_pattern(builder, *pattern, timeouts))
        .collect()
}
