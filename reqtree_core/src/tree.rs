//! The arena-addressed requirement tree: construction (`TreeBuilder`) and
//! the event-driven runtime (`RequirementTree`) that dispatches commands,
//! messages and timer fires through it (§3, §5, §9).
//!
//! Grounded on `betula_core/src/basic.rs`'s `BasicTree` (a `HashMap<NodeId,
//! _>` arena storing boxed node state next to its children) generalized
//! from a single `tick()` entry point to the four-direction dispatch this
//! domain needs, and on `rigelcore/simulations/requirements/node.py`'s
//! `send_upstream_cmd` / `send_downstream_cmd` for the propagation shape.

use crate::command::{BridgeHandle, Command};
use crate::error::{MalformedPattern, ReqError};
use crate::message::Message;
use crate::nodes::NodeKind;
use crate::scheduler::Scheduler;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Stable identity for a node in the arena (§9: "an arena of nodes
/// addressed by index... this removes all lifetime ambiguity").
#[derive(Clone, Copy, Eq, Hash, PartialEq, Debug)]
pub struct NodeId(Uuid);

impl NodeId {
    fn new() -> Self {
        NodeId(Uuid::new_v4())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Slot {
    kind: Mutex<NodeKind>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Number of children a node kind requires, used to validate construction
/// (§3 invariant 3).
fn expected_child_count(kind: &NodeKind) -> Option<usize> {
    match kind {
        NodeKind::Simple(_) => Some(0),
        NodeKind::Disjoint(_) => Some(2),
        NodeKind::Existence(_) => Some(1),
        NodeKind::Absence(_) => Some(1),
        NodeKind::Response(_) => Some(2),
        NodeKind::Requirement(_) => Some(2),
        NodeKind::Prevention(_) => Some(2),
        // The manager is the tree root; any number of top-level requirements
        // may be attached to it.
        NodeKind::Manager(_) => None,
    }
}

/// Builds a requirement tree node by node. Plain `&mut self` API; the tree
/// is frozen structurally the moment `build()` returns (§3 Lifecycle).
#[derive(Default)]
pub struct TreeBuilder {
    slots: HashMap<NodeId, Slot>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder {
            slots: HashMap::new(),
        }
    }

    /// Add a node with no children assigned yet. Returns its id.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::new();
        self.slots.insert(
            id,
            Slot {
                kind: Mutex::new(kind),
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    /// Wire `children` under `parent`, in order, validating the child count
    /// against the parent's kind (§3 invariant 3).
    pub fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) -> Result<(), ReqError> {
        let pattern_name;
        {
            let slot = self
                .slots
                .get(&parent)
                .expect("set_children: unknown parent id");
            let kind = slot.kind.lock();
            pattern_name = kind.kind_name();
            if let Some(expected) = expected_child_count(&kind) {
                if expected != children.len() {
                    return Err(Box::new(MalformedPattern {
                        pattern: pattern_name,
                        expected,
                        got: children.len(),
                    }));
                }
            }
        }
        for &child in &children {
            let child_slot = self
                .slots
                .get_mut(&child)
                .expect("set_children: unknown child id");
            child_slot.parent = Some(parent);
        }
        self.slots.get_mut(&parent).unwrap().children = children;
        Ok(())
    }

    /// Freeze the tree. From this point on structure never changes; only
    /// `satisfied`, `listening` and timer handles mutate (§3 Lifecycle).
    pub fn build(self, scheduler: Arc<dyn Scheduler>) -> Arc<RequirementTree> {
        Arc::new(RequirementTree {
            slots: self.slots,
            scheduler,
            finished: AtomicBool::new(false),
        })
    }
}

/// The built, concurrently accessible tree. Traversal (parent/children
/// lookups) needs no locking because structure is frozen; only a node's own
/// `NodeKind` is guarded, by its own mutex (§5).
pub struct RequirementTree {
    slots: HashMap<NodeId, Slot>,
    scheduler: Arc<dyn Scheduler>,
    /// Mirrors the Manager's own `finished` flag but is checked by leaves
    /// without taking the Manager's lock (§3 invariant 5, §7).
    finished: AtomicBool,
}

impl RequirementTree {
    fn slot(&self, id: NodeId) -> &Slot {
        self.slots.get(&id).expect("unknown NodeId")
    }

    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.slot(id).children.clone()
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).parent
    }

    pub fn satisfied_of(&self, id: NodeId) -> bool {
        self.slot(id).kind.lock().satisfied()
    }

    pub fn listening_of(&self, id: NodeId) -> bool {
        self.slot(id).kind.lock().listening()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn send_upstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        if let Some(parent) = self.parent_of(id) {
            self.handle_upstream(parent, cmd);
        }
    }

    fn send_downstream_to(self: &Arc<Self>, id: NodeId, cmd: Command) {
        self.handle_downstream(id, cmd);
    }

    fn send_downstream_all(self: &Arc<Self>, id: NodeId, cmd: Command) {
        for child in self.children_of(id) {
            self.send_downstream_to(child, cmd.clone());
        }
    }

    fn arm_timer(self: &Arc<Self>, id: NodeId, delay: std::time::Duration) -> crate::scheduler::TimerToken {
        let tree = Arc::clone(self);
        self.scheduler.arm(
            delay,
            Box::new(move || {
                tree.handle_timer(id);
            }),
        )
    }

    // ---- downstream commands (parent -> node) ----------------------------

    pub fn handle_downstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        let kind_name = self.slot(id).kind.lock().kind_name();
        match kind_name {
            "simple" => self.simple_downstream(id, cmd),
            "disjoint" => self.disjoint_downstream(id, cmd),
            "existence" => self.existence_downstream(id, cmd),
            "absence" => self.absence_downstream(id, cmd),
            "response" => self.response_downstream(id, cmd),
            "requirement" => self.requirement_downstream(id, cmd),
            "prevention" => self.prevention_downstream(id, cmd),
            "manager" => { /* the manager never receives downstream commands; it is the root */ }
            _ => unreachable!(),
        }
    }

    // ---- upstream commands (child -> parent) -----------------------------

    pub fn handle_upstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        let kind_name = self.slot(id).kind.lock().kind_name();
        match kind_name {
            "simple" => { /* leaves have no children; nothing to receive from below */ }
            "disjoint" => self.disjoint_upstream(id, cmd),
            "existence" => self.existence_upstream(id, cmd),
            "absence" => self.absence_upstream(id, cmd),
            "response" => self.response_upstream(id, cmd),
            "requirement" => self.requirement_upstream(id, cmd),
            "prevention" => self.prevention_upstream(id, cmd),
            "manager" => self.manager_upstream(id, cmd),
            _ => unreachable!(),
        }
    }

    // ---- inbound messages (bridge -> leaf) -------------------------------

    pub fn handle_message(self: &Arc<Self>, id: NodeId, message: &Message) {
        if self.is_finished() {
            return;
        }
        let slot = self.slot(id);
        let mut kind = slot.kind.lock();
        let s = match &mut *kind {
            NodeKind::Simple(s) => s,
            _ => return,
        };
        if !s.listening {
            return;
        }
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (s.predicate)(message)))
            .unwrap_or_else(|_| {
                log::warn!("predicate panicked while evaluating a message; treating as false");
                false
            });
        if result == s.satisfied {
            return;
        }
        s.satisfied = result;
        drop(kind);
        self.send_upstream(id, Command::StatusChange);
    }

    // ---- timer fires -------------------------------------------------------

    fn handle_timer(self: &Arc<Self>, id: NodeId) {
        let kind_name = self.slot(id).kind.lock().kind_name();
        match kind_name {
            "existence" => self.existence_timeout(id),
            "absence" => self.absence_timeout(id),
            "response" => self.response_timeout(id),
            "requirement" => self.requirement_timeout(id),
            "prevention" => self.prevention_timeout(id),
            _ => {}
        }
    }

    // ======================= Simple =======================================

    fn simple_downstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        let mut kind = self.slot(id).kind.lock();
        let s = match &mut *kind {
            NodeKind::Simple(s) => s,
            _ => unreachable!(),
        };
        match cmd {
            Command::RosbridgeConnect(client) => {
                if s.listening {
                    return;
                }
                let tree = Arc::clone(self);
                let handler: crate::command::MessageHandler =
                    Arc::new(move |m: &Message| tree.handle_message(id, m));
                let sub = client.register_message_handler(&s.topic, &s.message_type, handler);
                s.subscription = Some(sub);
                s.bridge = Some(client);
                s.listening = true;
            }
            Command::RosbridgeDisconnect => {
                if !s.listening {
                    return;
                }
                if let (Some(bridge), Some(sub)) = (s.bridge.take(), s.subscription.take()) {
                    bridge.remove_message_handler(&s.topic, &s.message_type, sub);
                }
                s.listening = false;
            }
            Command::StatusChange | Command::StopSimulation => {}
        }
    }

    // ======================= Disjoint =====================================

    fn disjoint_downstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        match cmd {
            Command::RosbridgeConnect(_) | Command::RosbridgeDisconnect => {
                let listening = matches!(cmd, Command::RosbridgeConnect(_));
                {
                    let mut kind = self.slot(id).kind.lock();
                    if let NodeKind::Disjoint(s) = &mut *kind {
                        s.listening = listening;
                    }
                }
                self.send_downstream_all(id, cmd);
            }
            _ => {}
        }
    }

    fn disjoint_upstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        if !matches!(cmd, Command::StatusChange) {
            return;
        }
        let children = self.children_of(id);
        let new_sat = children.iter().any(|&c| self.satisfied_of(c));
        let changed = {
            let mut kind = self.slot(id).kind.lock();
            match &mut *kind {
                NodeKind::Disjoint(s) if s.satisfied != new_sat => {
                    s.satisfied = new_sat;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.send_upstream(id, Command::StatusChange);
        }
    }

    // ======================= Existence ====================================

    fn existence_downstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        match cmd {
            Command::RosbridgeConnect(_) => {
                let child = self.children_of(id)[0];
                self.send_downstream_to(child, cmd.clone());
                let timeout = {
                    let mut kind = self.slot(id).kind.lock();
                    let s = match &mut *kind {
                        NodeKind::Existence(s) => s,
                        _ => unreachable!(),
                    };
                    s.listening = true;
                    s.timeout
                };
                if let Some(timeout) = timeout {
                    let token = self.arm_timer(id, timeout);
                    if let NodeKind::Existence(s) = &mut *self.slot(id).kind.lock() {
                        s.timer = Some(token);
                    }
                }
            }
            Command::RosbridgeDisconnect => {
                let child = self.children_of(id)[0];
                self.send_downstream_to(child, cmd.clone());
                let mut kind = self.slot(id).kind.lock();
                if let NodeKind::Existence(s) = &mut *kind {
                    s.listening = false;
                    if let Some(token) = s.timer.take() {
                        drop(kind);
                        self.scheduler.cancel(token);
                    }
                }
            }
            _ => {}
        }
    }

    fn existence_upstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        if !matches!(cmd, Command::StatusChange) {
            return;
        }
        let child = self.children_of(id)[0];
        let child_sat = self.satisfied_of(child);
        let changed = {
            let mut kind = self.slot(id).kind.lock();
            match &mut *kind {
                NodeKind::Existence(s) if s.satisfied != child_sat => {
                    s.satisfied = child_sat;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.send_upstream(id, Command::StatusChange);
        }
    }

    fn existence_timeout(self: &Arc<Self>, id: NodeId) {
        let satisfied = {
            let mut kind = self.slot(id).kind.lock();
            match &mut *kind {
                NodeKind::Existence(s) => {
                    s.timer = None;
                    s.satisfied
                }
                _ => return,
            }
        };
        self.send_downstream_all(id, Command::RosbridgeDisconnect);
        if !satisfied {
            self.send_upstream(id, Command::StopSimulation);
        }
    }

    // ======================= Absence =======================================

    fn absence_downstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        match cmd {
            Command::RosbridgeConnect(_) => {
                let child = self.children_of(id)[0];
                self.send_downstream_to(child, cmd.clone());
                let timeout = {
                    let mut kind = self.slot(id).kind.lock();
                    let s = match &mut *kind {
                        NodeKind::Absence(s) => s,
                        _ => unreachable!(),
                    };
                    s.listening = true;
                    s.timeout
                };
                if let Some(timeout) = timeout {
                    let token = self.arm_timer(id, timeout);
                    if let NodeKind::Absence(s) = &mut *self.slot(id).kind.lock() {
                        s.timer = Some(token);
                    }
                }
            }
            Command::RosbridgeDisconnect => {
                let child = self.children_of(id)[0];
                self.send_downstream_to(child, cmd.clone());
                let mut kind = self.slot(id).kind.lock();
                if let NodeKind::Absence(s) = &mut *kind {
                    s.listening = false;
                    if let Some(token) = s.timer.take() {
                        drop(kind);
                        self.scheduler.cancel(token);
                    }
                }
            }
            _ => {}
        }
    }

    fn absence_upstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        if !matches!(cmd, Command::StatusChange) {
            return;
        }
        let child = self.children_of(id)[0];
        let child_sat = self.satisfied_of(child);
        // Monotone: once violated (flipped to false) it never recovers.
        let changed = {
            let mut kind = self.slot(id).kind.lock();
            match &mut *kind {
                NodeKind::Absence(s) => {
                    s.witnessed = true;
                    if s.satisfied && child_sat {
                        s.satisfied = false;
                        true
                    } else {
                        false
                    }
                }
                _ => false,
            }
        };
        if changed {
            self.send_upstream(id, Command::StatusChange);
        }
    }

    fn absence_timeout(self: &Arc<Self>, id: NodeId) {
        {
            let mut kind = self.slot(id).kind.lock();
            if let NodeKind::Absence(s) = &mut *kind {
                s.timer = None;
                // The observation window elapsed: whatever `satisfied`
                // holds now (even vacuously true) is the final verdict.
                s.witnessed = true;
            }
        }
        self.send_downstream_all(id, Command::RosbridgeDisconnect);
    }

    // ======================= Response ======================================

    fn response_downstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        match cmd {
            Command::RosbridgeConnect(client) => {
                let anterior = self.children_of(id)[0];
                let timeout = {
                    let mut kind = self.slot(id).kind.lock();
                    let s = match &mut *kind {
                        NodeKind::Response(s) => s,
                        _ => unreachable!(),
                    };
                    s.saved_connect = Some(Arc::clone(&client));
                    s.listening = true;
                    s.timeout
                };
                self.send_downstream_to(anterior, Command::RosbridgeConnect(client));
                if let Some(timeout) = timeout {
                    let token = self.arm_timer(id, timeout);
                    if let NodeKind::Response(s) = &mut *self.slot(id).kind.lock() {
                        s.timer = Some(token);
                    }
                }
            }
            Command::RosbridgeDisconnect => {
                let (token, prior_sat) = {
                    let mut kind = self.slot(id).kind.lock();
                    let s = match &mut *kind {
                        NodeKind::Response(s) => s,
                        _ => unreachable!(),
                    };
                    s.listening = false;
                    s.saved_connect = None;
                    (s.timer.take(), s.satisfied)
                };
                if let Some(token) = token {
                    self.scheduler.cancel(token);
                }
                let children = self.children_of(id);
                let new_sat = self.satisfied_of(children[0]) && self.satisfied_of(children[1]);
                if new_sat != prior_sat {
                    if let NodeKind::Response(s) = &mut *self.slot(id).kind.lock() {
                        s.satisfied = new_sat;
                    }
                    self.send_upstream(id, Command::StatusChange);
                }
                self.send_downstream_all(id, Command::RosbridgeDisconnect);
            }
            _ => {}
        }
    }

    fn response_upstream(self: &Arc<Self>, id: NodeId, _cmd: Command) {
        let children = self.children_of(id);
        let (anterior, posterior) = (children[0], children[1]);
        if !self.listening_of(posterior) {
            let saved = {
                let kind = self.slot(id).kind.lock();
                match &*kind {
                    NodeKind::Response(s) => s.saved_connect.clone(),
                    _ => unreachable!(),
                }
            };
            if let Some(saved) = saved {
                self.send_downstream_to(posterior, Command::RosbridgeConnect(saved));
            }
            return;
        }

        let new_sat = self.satisfied_of(anterior) && self.satisfied_of(posterior);
        let (changed, token) = {
            let mut kind = self.slot(id).kind.lock();
            match &mut *kind {
                NodeKind::Response(s) => {
                    s.witnessed = true;
                    if s.satisfied != new_sat {
                        s.satisfied = new_sat;
                        (true, if new_sat { s.timer.take() } else { None })
                    } else {
                        (false, None)
                    }
                }
                _ => (false, None),
            }
        };
        if changed {
            if new_sat {
                if let Some(token) = token {
                    self.scheduler.cancel(token);
                }
                self.send_downstream_all(id, Command::RosbridgeDisconnect);
            }
            self.send_upstream(id, Command::StatusChange);
        }
    }

    fn response_timeout(self: &Arc<Self>, id: NodeId) {
        let satisfied = {
            let mut kind = self.slot(id).kind.lock();
            match &mut *kind {
                NodeKind::Response(s) => {
                    s.timer = None;
                    // The observation window elapsed: whatever `satisfied`
                    // holds now (even vacuously true) is the final verdict.
                    s.witnessed = true;
                    s.satisfied
                }
                _ => return,
            }
        };
        if satisfied {
            self.send_upstream(id, Command::StatusChange);
            self.send_downstream_all(id, Command::RosbridgeDisconnect);
        } else {
            self.send_upstream(id, Command::StopSimulation);
        }
    }

    // ======================= Requirement ===================================
    // Children reversed: index 0 = posterior, index 1 = anterior (§4.8).

    fn requirement_downstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        match cmd {
            Command::RosbridgeConnect(_) => {
                self.send_downstream_all(id, cmd.clone());
                let timeout = {
                    let mut kind = self.slot(id).kind.lock();
                    let s = match &mut *kind {
                        NodeKind::Requirement(s) => s,
                        _ => unreachable!(),
                    };
                    s.listening = true;
                    s.timeout
                };
                if let Some(timeout) = timeout {
                    let token = self.arm_timer(id, timeout);
                    if let NodeKind::Requirement(s) = &mut *self.slot(id).kind.lock() {
                        s.timer = Some(token);
                    }
                }
            }
            Command::RosbridgeDisconnect => {
                self.send_downstream_all(id, cmd.clone());
                let mut kind = self.slot(id).kind.lock();
                if let NodeKind::Requirement(s) = &mut *kind {
                    s.listening = false;
                    if let Some(token) = s.timer.take() {
                        drop(kind);
                        self.scheduler.cancel(token);
                    }
                }
            }
            _ => {}
        }
    }

    fn requirement_upstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        if !matches!(cmd, Command::StatusChange) {
            return;
        }
        let children = self.children_of(id);
        let (posterior, anterior) = (children[0], children[1]);
        let new_sat = self.satisfied_of(posterior) && self.satisfied_of(anterior);
        let changed = {
            let mut kind = self.slot(id).kind.lock();
            match &mut *kind {
                NodeKind::Requirement(s) if s.satisfied != new_sat => {
                    s.satisfied = new_sat;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.send_upstream(id, Command::StatusChange);
        }
    }

    fn requirement_timeout(self: &Arc<Self>, id: NodeId) {
        let satisfied = {
            let mut kind = self.slot(id).kind.lock();
            match &mut *kind {
                NodeKind::Requirement(s) => {
                    s.timer = None;
                    s.satisfied
                }
                _ => return,
            }
        };
        self.send_downstream_all(id, Command::RosbridgeDisconnect);
        if satisfied {
            self.send_upstream(id, Command::StatusChange);
        } else {
            self.send_upstream(id, Command::StopSimulation);
        }
    }

    // ======================= Prevention =====================================

    fn prevention_downstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        match cmd {
            Command::RosbridgeConnect(_) => {
                self.send_downstream_all(id, cmd.clone());
                let timeout = {
                    let mut kind = self.slot(id).kind.lock();
                    let s = match &mut *kind {
                        NodeKind::Prevention(s) => s,
                        _ => unreachable!(),
                    };
                    s.listening = true;
                    s.timeout
                };
                if let Some(timeout) = timeout {
                    let token = self.arm_timer(id, timeout);
                    if let NodeKind::Prevention(s) = &mut *self.slot(id).kind.lock() {
                        s.timer = Some(token);
                    }
                }
            }
            Command::RosbridgeDisconnect => {
                self.send_downstream_all(id, cmd.clone());
                let mut kind = self.slot(id).kind.lock();
                if let NodeKind::Prevention(s) = &mut *kind {
                    s.listening = false;
                    if let Some(token) = s.timer.take() {
                        drop(kind);
                        self.scheduler.cancel(token);
                    }
                }
            }
            _ => {}
        }
    }

    fn prevention_upstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        if !matches!(cmd, Command::StatusChange) {
            return;
        }
        let children = self.children_of(id);
        let (anterior, posterior) = (children[0], children[1]);
        let already_violated = matches!(&*self.slot(id).kind.lock(), NodeKind::Prevention(s) if s.violated);
        if already_violated {
            return;
        }
        let a = self.satisfied_of(anterior);
        let p = self.satisfied_of(posterior);
        if !(a && p) {
            return;
        }
        let token = {
            let mut kind = self.slot(id).kind.lock();
            match &mut *kind {
                NodeKind::Prevention(s) => {
                    s.violated = true;
                    s.satisfied = false;
                    s.timer.take()
                }
                _ => unreachable!(),
            }
        };
        if let Some(token) = token {
            self.scheduler.cancel(token);
        }
        self.send_upstream(id, Command::StopSimulation);
        self.send_downstream_all(id, Command::RosbridgeDisconnect);
    }

    fn prevention_timeout(self: &Arc<Self>, id: NodeId) {
        let already_violated = matches!(&*self.slot(id).kind.lock(), NodeKind::Prevention(s) if s.violated);
        if already_violated {
            return;
        }
        let children = self.children_of(id);
        let (anterior, posterior) = (children[0], children[1]);
        let a = self.satisfied_of(anterior);
        let p = self.satisfied_of(posterior);
        let satisfied = a && !p;
        {
            let mut kind = self.slot(id).kind.lock();
            if let NodeKind::Prevention(s) = &mut *kind {
                s.timer = None;
                s.satisfied = satisfied;
            }
        }
        self.send_downstream_all(id, Command::RosbridgeDisconnect);
        if !satisfied {
            self.send_upstream(id, Command::StopSimulation);
        }
    }

    // ======================= Manager =========================================

    fn manager_upstream(self: &Arc<Self>, id: NodeId, cmd: Command) {
        match cmd {
            Command::StatusChange => self.manager_recompute(id),
            Command::StopSimulation => self.manager_stop(id),
            _ => {}
        }
    }

    /// The manager's satisfaction as a pure function of its children,
    /// independent of the cached transition-detection flag (P2). Used both
    /// by recompute (to detect a true transition) and by the public
    /// `Manager::satisfied()` getter, which must stay accurate even when no
    /// child ever re-signals after an already-vacuously-true start.
    pub fn manager_live_satisfied(&self, id: NodeId) -> bool {
        let children = self.children_of(id);
        if children.is_empty() {
            false
        } else {
            children.iter().all(|&c| self.satisfied_of(c))
        }
    }

    fn manager_recompute(self: &Arc<Self>, id: NodeId) {
        if self.is_finished() {
            return;
        }
        let new_sat = self.manager_live_satisfied(id);
        let changed = {
            let mut kind = self.slot(id).kind.lock();
            match &mut *kind {
                NodeKind::Manager(s) if s.satisfied != new_sat => {
                    s.satisfied = new_sat;
                    true
                }
                _ => false,
            }
        };
        if changed && new_sat {
            self.manager_cancel_timers(id);
            self.manager_stop(id);
        }
    }

    /// A child's satisfaction counted toward a genuinely observed outcome.
    /// Response and Absence both start out vacuously `satisfied = true`
    /// before either has witnessed a child transition or reached their own
    /// timeout; that initial value must not look like a real confirmation
    /// to the manager's start-timer assessment below.
    fn witnessed_satisfied_of(&self, id: NodeId) -> bool {
        let kind = self.slot(id).kind.lock();
        match &*kind {
            NodeKind::Response(s) => s.satisfied && s.witnessed,
            NodeKind::Absence(s) => s.satisfied && s.witnessed,
            other => other.satisfied(),
        }
    }

    /// min_timeout firing: "emulate a StatusChange to detect requirements
    /// that are already genuinely satisfied" (§4.10). Unlike a real
    /// upstream StatusChange, this assessment is driven by elapsed time,
    /// not an observed event, so a still-vacuous Response/Absence (never
    /// witnessed) must not be allowed to drive an early stop — only a
    /// child that has actually witnessed its outcome can.
    fn manager_min_timeout_fire(self: &Arc<Self>, id: NodeId) {
        if self.is_finished() {
            return;
        }
        let new_sat = self.manager_live_satisfied(id);
        let changed = {
            let mut kind = self.slot(id).kind.lock();
            match &mut *kind {
                NodeKind::Manager(s) if s.satisfied != new_sat => {
                    s.satisfied = new_sat;
                    true
                }
                _ => false,
            }
        };
        if !changed || !new_sat {
            return;
        }
        let children = self.children_of(id);
        let genuinely_satisfied =
            !children.is_empty() && children.iter().all(|&c| self.witnessed_satisfied_of(c));
        if genuinely_satisfied {
            self.manager_cancel_timers(id);
            self.manager_stop(id);
        }
    }

    fn manager_cancel_timers(self: &Arc<Self>, id: NodeId) {
        let (start, stop) = {
            let mut kind = self.slot(id).kind.lock();
            match &mut *kind {
                NodeKind::Manager(s) => (s.start_timer.take(), s.stop_timer.take()),
                _ => (None, None),
            }
        };
        if let Some(t) = start {
            self.scheduler.cancel(t);
        }
        if let Some(t) = stop {
            self.scheduler.cancel(t);
        }
    }

    fn manager_stop(self: &Arc<Self>, id: NodeId) {
        let already = {
            let mut kind = self.slot(id).kind.lock();
            match &mut *kind {
                NodeKind::Manager(s) => {
                    let was = s.finished;
                    s.finished = true;
                    was
                }
                _ => return,
            }
        };
        if already {
            return;
        }
        self.manager_cancel_timers(id);
        self.finished.store(true, Ordering::SeqCst);
        self.send_downstream_all(id, Command::RosbridgeDisconnect);
    }

    /// Start the simulation: connect all top-level requirements to the
    /// bridge and arm the start/stop deadlines (§4.10).
    pub fn manager_connect(self: &Arc<Self>, id: NodeId, client: BridgeHandle) {
        self.send_downstream_all(id, Command::RosbridgeConnect(client));
        let (min_timeout, max_timeout) = {
            let kind = self.slot(id).kind.lock();
            match &*kind {
                NodeKind::Manager(s) => (s.min_timeout, s.max_timeout),
                _ => unreachable!(),
            }
        };

        let tree_start = Arc::clone(self);
        let start_token = self.scheduler.arm(
            min_timeout,
            Box::new(move || tree_start.manager_min_timeout_fire(id)),
        );
        let tree_stop = Arc::clone(self);
        let stop_token = self
            .scheduler
            .arm(max_timeout, Box::new(move || tree_stop.manager_stop(id)));

        let mut kind = self.slot(id).kind.lock();
        if let NodeKind::Manager(s) = &mut *kind {
            s.start_timer = Some(start_token);
            s.stop_timer = Some(stop_token);
        }
    }

    pub fn manager_disconnect(self: &Arc<Self>, id: NodeId) {
        self.send_downstream_all(id, Command::RosbridgeDisconnect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{BridgeClient, MessageHandler, SubscriptionId};
    use crate::manager::ManagerBuilder;
    use crate::message::Value;
    use crate::nodes::{
        AbsenceState, ExistenceState, PreventionState, ResponseState, SimpleState,
    };
    use crate::scheduler::ManualScheduler;
    use std::sync::atomic::AtomicU64;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// An in-memory bridge: registers handlers keyed by topic and lets
    /// tests deliver messages directly, synchronously.
    struct TestBridge {
        handlers: StdMutex<HashMap<SubscriptionId, (String, MessageHandler)>>,
        next_id: AtomicU64,
    }

    impl TestBridge {
        fn new() -> Arc<Self> {
            Arc::new(TestBridge {
                handlers: StdMutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            })
        }

        fn deliver(&self, topic: &str, message: &Message) {
            let handlers = self.handlers.lock().unwrap();
            for (t, handler) in handlers.values() {
                if t == topic {
                    handler(message);
                }
            }
        }
    }

    impl std::fmt::Debug for TestBridge {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "TestBridge")
        }
    }

    impl BridgeClient for TestBridge {
        fn register_message_handler(
            &self,
            topic: &str,
            _message_type: &str,
            handler: MessageHandler,
        ) -> SubscriptionId {
            let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
            self.handlers
                .lock()
                .unwrap()
                .insert(id, (topic.to_string(), handler));
            id
        }

        fn remove_message_handler(&self, _topic: &str, _message_type: &str, sub: SubscriptionId) {
            self.handlers.lock().unwrap().remove(&sub);
        }
    }

    fn field_eq_int(field: &'static str, value: i64) -> crate::nodes::Predicate {
        Arc::new(move |m: &Message| matches!(m.get(field), Some(Value::Int(v)) if *v == value))
    }

    fn msg(field: &str, value: i64) -> Message {
        let mut m = Message::new();
        m.insert(field.to_string(), Value::Int(value));
        m
    }

    #[test]
    fn scenario_existence_satisfied() {
        let mut mb = ManagerBuilder::new(Duration::from_secs(10), Duration::from_secs(100));
        let leaf = mb
            .builder_mut()
            .add_node(NodeKind::Simple(SimpleState::new(
                "t".into(),
                "T".into(),
                field_eq_int("x", 1),
            )));
        let existence = mb
            .builder_mut()
            .add_node(NodeKind::Existence(ExistenceState::new(Some(
                Duration::from_secs(10),
            ))));
        mb.builder_mut().set_children(existence, vec![leaf]).unwrap();
        mb.add_child(existence);

        let scheduler: Arc<dyn Scheduler> = Arc::new(ManualScheduler::new());
        let manager = mb.build(Arc::clone(&scheduler)).unwrap();
        let bridge = TestBridge::new();
        manager.connect(bridge.clone());

        bridge.deliver("t", &msg("x", 1));

        assert!(manager.satisfied());
        assert!(manager.finished());
    }

    #[test]
    fn scenario_existence_timeout() {
        let mut mb = ManagerBuilder::new(Duration::from_secs(10), Duration::from_secs(100));
        let leaf = mb
            .builder_mut()
            .add_node(NodeKind::Simple(SimpleState::new(
                "t".into(),
                "T".into(),
                field_eq_int("x", 1),
            )));
        let existence = mb
            .builder_mut()
            .add_node(NodeKind::Existence(ExistenceState::new(Some(
                Duration::from_secs(10),
            ))));
        mb.builder_mut().set_children(existence, vec![leaf]).unwrap();
        mb.add_child(existence);

        let scheduler = Arc::new(ManualScheduler::new());
        let manager = mb.build(Arc::clone(&scheduler) as Arc<dyn Scheduler>).unwrap();
        let bridge = TestBridge::new();
        manager.connect(bridge.clone());

        scheduler.advance(Duration::from_secs(10));

        assert!(manager.finished());
        assert!(!manager.satisfied());
    }

    #[test]
    fn scenario_absence_violated() {
        let mut mb = ManagerBuilder::new(Duration::from_secs(5), Duration::from_secs(2));
        let leaf = mb
            .builder_mut()
            .add_node(NodeKind::Simple(SimpleState::new(
                "t".into(),
                "T".into(),
                Arc::new(|m: &Message| matches!(m.get("x"), Some(Value::Int(v)) if *v > 0)),
            )));
        let absence = mb
            .builder_mut()
            .add_node(NodeKind::Absence(AbsenceState::new(None)));
        mb.builder_mut().set_children(absence, vec![leaf]).unwrap();
        mb.add_child(absence);

        let scheduler = Arc::new(ManualScheduler::new());
        let manager = mb.build(Arc::clone(&scheduler) as Arc<dyn Scheduler>).unwrap();
        let bridge = TestBridge::new();
        manager.connect(bridge.clone());

        scheduler.advance(Duration::from_secs(1));
        bridge.deliver("t", &msg("x", 5));
        assert!(!manager.finished());

        scheduler.advance(Duration::from_secs(4));
        assert!(manager.finished());
        assert!(!manager.satisfied());
    }

    #[test]
    fn scenario_absence_never_violated_requires_full_window() {
        // Realistic default min_timeout=0: an Absence that is never
        // violated is vacuously `satisfied = true` from construction, but
        // that must not let the start-timer assessment end the run before
        // the full observation window has elapsed.
        let mut mb = ManagerBuilder::new(Duration::from_secs(5), Duration::ZERO);
        let leaf = mb
            .builder_mut()
            .add_node(NodeKind::Simple(SimpleState::new(
                "t".into(),
                "T".into(),
                Arc::new(|m: &Message| matches!(m.get("x"), Some(Value::Int(v)) if *v > 0)),
            )));
        let absence = mb
            .builder_mut()
            .add_node(NodeKind::Absence(AbsenceState::new(None)));
        mb.builder_mut().set_children(absence, vec![leaf]).unwrap();
        mb.add_child(absence);

        let scheduler = Arc::new(ManualScheduler::new());
        let manager = mb.build(Arc::clone(&scheduler) as Arc<dyn Scheduler>).unwrap();
        let bridge = TestBridge::new();
        manager.connect(bridge.clone());

        scheduler.advance(Duration::ZERO);
        assert!(!manager.finished());

        scheduler.advance(Duration::from_secs(5));
        assert!(manager.finished());
        assert!(manager.satisfied());
    }

    #[test]
    fn scenario_response_ordering() {
        // Realistic default min_timeout=0 (§4.10/§6): the start-timer
        // assessment fires immediately on connect and must not mistake
        // the Response's still-vacuous `satisfied = true` for a genuine
        // outcome before anything has been witnessed.
        let mut mb = ManagerBuilder::new(Duration::from_secs(60), Duration::ZERO);
        let anterior = mb
            .builder_mut()
            .add_node(NodeKind::Simple(SimpleState::new(
                "a".into(),
                "A".into(),
                field_eq_int("a", 1),
            )));
        let posterior = mb
            .builder_mut()
            .add_node(NodeKind::Simple(SimpleState::new(
                "b".into(),
                "B".into(),
                field_eq_int("b", 1),
            )));
        let response = mb
            .builder_mut()
            .add_node(NodeKind::Response(ResponseState::new(Some(
                Duration::from_secs(5),
            ))));
        mb.builder_mut()
            .set_children(response, vec![anterior, posterior])
            .unwrap();
        mb.add_child(response);

        let scheduler = Arc::new(ManualScheduler::new());
        let manager = mb.build(Arc::clone(&scheduler) as Arc<dyn Scheduler>).unwrap();
        let bridge = TestBridge::new();
        manager.connect(bridge.clone());

        // The min_timeout=0 start-timer fires right away; nothing has
        // been witnessed yet, so the manager must still be running.
        scheduler.advance(Duration::ZERO);
        assert!(!manager.finished());

        scheduler.advance(Duration::from_secs(1));
        bridge.deliver("a", &msg("a", 1));
        scheduler.advance(Duration::from_secs(1));
        bridge.deliver("b", &msg("b", 1));

        scheduler.advance(Duration::from_secs(3));

        assert!(manager.finished());
        assert!(manager.satisfied());
    }

    #[test]
    fn scenario_response_inversion() {
        // Realistic default min_timeout=0: must not let the vacuous
        // initial `satisfied = true` short-circuit the run before the
        // inversion (posterior-before-anterior) is actually observed.
        let mut mb = ManagerBuilder::new(Duration::from_secs(60), Duration::ZERO);
        let anterior = mb
            .builder_mut()
            .add_node(NodeKind::Simple(SimpleState::new(
                "a".into(),
                "A".into(),
                field_eq_int("a", 1),
            )));
        let posterior = mb
            .builder_mut()
            .add_node(NodeKind::Simple(SimpleState::new(
                "b".into(),
                "B".into(),
                field_eq_int("b", 1),
            )));
        let response = mb
            .builder_mut()
            .add_node(NodeKind::Response(ResponseState::new(Some(
                Duration::from_secs(5),
            ))));
        mb.builder_mut()
            .set_children(response, vec![anterior, posterior])
            .unwrap();
        mb.add_child(response);

        let scheduler = Arc::new(ManualScheduler::new());
        let manager = mb.build(Arc::clone(&scheduler) as Arc<dyn Scheduler>).unwrap();
        let bridge = TestBridge::new();
        manager.connect(bridge.clone());

        // The min_timeout=0 start-timer fires right away; the Response
        // is still vacuously `satisfied = true` but unwitnessed, so this
        // must not finish the manager early.
        scheduler.advance(Duration::ZERO);
        assert!(!manager.finished());

        scheduler.advance(Duration::from_secs(1));
        // posterior isn't subscribed yet (anterior never fired): dropped.
        bridge.deliver("b", &msg("b", 1));

        scheduler.advance(Duration::from_secs(4));

        assert!(manager.finished());
        assert!(!manager.satisfied());
    }

    #[test]
    fn scenario_prevention_violated() {
        let mut mb = ManagerBuilder::new(Duration::from_secs(60), Duration::from_secs(100));
        let anterior = mb
            .builder_mut()
            .add_node(NodeKind::Simple(SimpleState::new(
                "a".into(),
                "A".into(),
                field_eq_int("a", 1),
            )));
        let posterior = mb
            .builder_mut()
            .add_node(NodeKind::Simple(SimpleState::new(
                "b".into(),
                "B".into(),
                field_eq_int("b", 1),
            )));
        let prevention = mb
            .builder_mut()
            .add_node(NodeKind::Prevention(PreventionState::new(None)));
        mb.builder_mut()
            .set_children(prevention, vec![anterior, posterior])
            .unwrap();
        mb.add_child(prevention);

        let scheduler = Arc::new(ManualScheduler::new());
        let manager = mb.build(Arc::clone(&scheduler) as Arc<dyn Scheduler>).unwrap();
        let bridge = TestBridge::new();
        manager.connect(bridge.clone());

        bridge.deliver("a", &msg("a", 1));
        bridge.deliver("b", &msg("b", 1));

        assert!(manager.finished());
        assert!(!manager.satisfied());
    }

    #[test]
    fn malformed_pattern_rejects_wrong_child_count() {
        let mut tb = TreeBuilder::new();
        let only_child = tb.add_node(NodeKind::Simple(SimpleState::new(
            "t".into(),
            "T".into(),
            field_eq_int("x", 1),
        )));
        let response = tb.add_node(NodeKind::Response(ResponseState::new(None)));
        let err = tb.set_children(response, vec![only_child]).unwrap_err();
        assert!(err.to_string().contains("requires 2 children"));
    }

    #[test]
    fn double_connect_disconnect_leaves_subscription_count_unchanged() {
        let mut mb = ManagerBuilder::new(Duration::from_secs(10), Duration::from_secs(100));
        let leaf = mb
            .builder_mut()
            .add_node(NodeKind::Simple(SimpleState::new(
                "t".into(),
                "T".into(),
                field_eq_int("x", 1),
            )));
        mb.add_child(leaf);
        let scheduler = Arc::new(ManualScheduler::new());
        let manager = mb.build(Arc::clone(&scheduler) as Arc<dyn Scheduler>).unwrap();
        let bridge = TestBridge::new();

        manager.connect(bridge.clone());
        manager.connect(bridge.clone());
        assert_eq!(bridge.handlers.lock().unwrap().len(), 1);

        manager.disconnect();
        manager.disconnect();
        assert_eq!(bridge.handlers.lock().unwrap().len(), 0);
    }
}
