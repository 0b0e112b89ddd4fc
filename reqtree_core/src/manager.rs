//! Public facade over the tree root (§6: `Manager(max_timeout, min_timeout)`
//! with `add_child`, `connect`, `disconnect`, `finished`, `satisfied`).
//!
//! Construction is two-phase (§3 Lifecycle: "frozen structurally after
//! construction"): `ManagerBuilder` accumulates top-level requirement
//! subtrees, then `build()` hands back the frozen, concurrently accessible
//! `Manager`. `add_child` therefore lives on the builder, not on the
//! runtime handle.

use crate::command::BridgeHandle;
use crate::error::ReqError;
use crate::nodes::{ManagerState, NodeKind};
use crate::scheduler::Scheduler;
use crate::tree::{NodeId, RequirementTree, TreeBuilder};
use std::sync::Arc;
use std::time::Duration;

pub struct ManagerBuilder {
    builder: TreeBuilder,
    manager_id: NodeId,
    top_level: Vec<NodeId>,
}

impl ManagerBuilder {
    pub fn new(max_timeout: Duration, min_timeout: Duration) -> Self {
        let mut builder = TreeBuilder::new();
        let manager_id = builder.add_node(NodeKind::Manager(ManagerState::new(
            max_timeout,
            min_timeout,
        )));
        ManagerBuilder {
            builder,
            manager_id,
            top_level: Vec::new(),
        }
    }

    /// The id of the manager node itself, needed by callers building
    /// subtrees with `builder_mut()` before attaching them here.
    pub fn manager_id(&self) -> NodeId {
        self.manager_id
    }

    /// Direct access to the underlying builder, for constructing the
    /// top-level requirement subtrees that get passed to `add_child`.
    pub fn builder_mut(&mut self) -> &mut TreeBuilder {
        &mut self.builder
    }

    /// Attach a top-level requirement subtree's root as a child of the
    /// manager.
    pub fn add_child(&mut self, root: NodeId) {
        self.top_level.push(root);
    }

    pub fn build(mut self, scheduler: Arc<dyn Scheduler>) -> Result<Manager, ReqError> {
        self.builder.set_children(self.manager_id, self.top_level)?;
        let tree = self.builder.build(scheduler);
        Ok(Manager {
            tree,
            id: self.manager_id,
        })
    }
}

/// The frozen, running tree's root handle.
pub struct Manager {
    tree: Arc<RequirementTree>,
    id: NodeId,
}

impl Manager {
    /// Broadcast `RosbridgeConnect` downstream and arm both deadlines
    /// (§4.10).
    pub fn connect(&self, client: BridgeHandle) {
        self.tree.manager_connect(self.id, client);
    }

    /// Broadcast `RosbridgeDisconnect` downstream.
    pub fn disconnect(&self) {
        self.tree.manager_disconnect(self.id);
    }

    /// Whether the simulation has ended, by any of: all requirements
    /// satisfied, `max_timeout` elapsed, or a descendant's `StopSimulation`.
    pub fn finished(&self) -> bool {
        self.tree.is_finished()
    }

    /// AND of all top-level requirements' `satisfied` flags, computed live
    /// so it stays accurate even if a requirement was already vacuously
    /// satisfied at connect time and never re-signalled (P2).
    pub fn satisfied(&self) -> bool {
        self.tree.manager_live_satisfied(self.id)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The underlying tree, for inspecting individual requirement results
    /// after `finished()` (§7: "Each top-level requirement's final
    /// `satisfied` is observable after `finished`").
    pub fn tree(&self) -> &Arc<RequirementTree> {
        &self.tree
    }
}
