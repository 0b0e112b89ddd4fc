//! The closed taxonomy of requirement node kinds, one submodule per kind
//! (§9 Design Note: "polymorphism over node kinds", mirroring the teacher's
//! one-file-per-node-type layout under `betula_core/src/nodes/`).
//!
//! Unlike the teacher, which dispatches through a `Node` trait object per
//! node, every kind here is a plain data variant and dispatch happens
//! through a single match in `tree.rs`. The spec names this explicitly as
//! the preferred shape for a small, closed, non-extensible set of kinds.

mod absence;
mod disjoint;
mod existence;
mod manager;
mod prevention;
mod requirement;
mod response;
mod simple;

pub use absence::{AbsenceConfig, AbsenceState};
pub use disjoint::DisjointState;
pub use existence::{ExistenceConfig, ExistenceState};
pub use manager::ManagerState;
pub use prevention::{PreventionConfig, PreventionState};
pub use requirement::{RequirementConfig, RequirementState};
pub use response::{ResponseConfig, ResponseState};
pub use simple::SimpleState;

use std::sync::Arc;

/// A compiled predicate: decides whether a decoded message satisfies some
/// property. Predicates never borrow the message; they are pure functions
/// of it (§4.1).
pub type Predicate = Arc<dyn Fn(&crate::message::Message) -> bool + Send + Sync>;

/// The full set of evaluator kinds a requirement tree can be built from.
/// Every node in the tree is exactly one of these (§9).
#[derive(Debug)]
pub enum NodeKind {
    Simple(SimpleState),
    Disjoint(DisjointState),
    Existence(ExistenceState),
    Absence(AbsenceState),
    Response(ResponseState),
    Requirement(RequirementState),
    Prevention(PreventionState),
    Manager(ManagerState),
}

impl NodeKind {
    pub fn satisfied(&self) -> bool {
        match self {
            NodeKind::Simple(s) => s.satisfied,
            NodeKind::Disjoint(s) => s.satisfied,
            NodeKind::Existence(s) => s.satisfied,
            NodeKind::Absence(s) => s.satisfied,
            NodeKind::Response(s) => s.satisfied,
            NodeKind::Requirement(s) => s.satisfied,
            NodeKind::Prevention(s) => s.satisfied,
            NodeKind::Manager(s) => s.satisfied,
        }
    }

    pub fn listening(&self) -> bool {
        match self {
            NodeKind::Simple(s) => s.listening,
            NodeKind::Disjoint(s) => s.listening,
            NodeKind::Existence(s) => s.listening,
            NodeKind::Absence(s) => s.listening,
            NodeKind::Response(s) => s.listening,
            NodeKind::Requirement(s) => s.listening,
            NodeKind::Prevention(s) => s.listening,
            NodeKind::Manager(s) => s.listening,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Simple(_) => "simple",
            NodeKind::Disjoint(_) => "disjoint",
            NodeKind::Existence(_) => "existence",
            NodeKind::Absence(_) => "absence",
            NodeKind::Response(_) => "response",
            NodeKind::Requirement(_) => "requirement",
            NodeKind::Prevention(_) => "prevention",
            NodeKind::Manager(_) => "manager",
        }
    }
}
