//! Requirements tree runtime.
//!
//! A small event-driven tree of evaluator nodes that decides, online and
//! under deadlines, whether a set of formal requirements over live message
//! streams holds. See the crate-level design ledger (`DESIGN.md` at the
//! workspace root) for where each piece is grounded.

pub mod command;
pub mod error;
pub mod manager;
pub mod message;
pub mod nodes;
pub mod scheduler;
pub mod tree;

pub mod prelude {
    pub use crate::command::{BridgeClient, BridgeHandle, Command, MessageHandler, SubscriptionId};
    pub use crate::error::{MalformedPattern, ReqError, UnknownEventKind, UnsupportedOperator};
    pub use crate::manager::{Manager, ManagerBuilder};
    pub use crate::message::{Message, Value};
    pub use crate::nodes::{
        AbsenceConfig, ExistenceConfig, NodeKind, PreventionConfig, Predicate, RequirementConfig,
        ResponseConfig,
    };
    pub use crate::scheduler::{Scheduler, TimerToken};
    pub use crate::tree::{NodeId, RequirementTree, TreeBuilder};
}

pub use command::{BridgeClient, BridgeHandle, Command, SubscriptionId};
pub use error::ReqError;
pub use manager::{Manager, ManagerBuilder};
pub use message::{Message, Value};
pub use nodes::{NodeKind, Predicate};
pub use scheduler::{Scheduler, TimerToken};
pub use tree::{NodeId, RequirementTree, TreeBuilder};
