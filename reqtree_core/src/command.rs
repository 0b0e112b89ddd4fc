//! The bidirectional command protocol (§3, §9) and the bridge-client
//! interface it rides on (§6).
//!
//! `Command` mirrors the teacher's `InteractionCommand` enum in spirit
//! (`betula_common::control::InteractionCommand`): a small closed set of
//! tagged messages propagated through the tree, built with a constructor
//! per variant rather than exposed as raw struct literals everywhere.

use crate::message::Message;
use std::fmt;
use std::sync::Arc;

/// Opaque identity assigned by the bridge to a registered handler. The
/// bridge owns the subscription registry (§5); the tree only needs to hand
/// this back unchanged to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A callback a leaf registers for inbound messages on a topic.
pub type MessageHandler = Arc<dyn Fn(&Message) + Send + Sync>;

/// The bridge client interface consumed by leaves (§6). The transport
/// itself, and decoding wire bytes into `Message`, are both out of scope;
/// this is the entire surface the tree depends on.
pub trait BridgeClient: Send + Sync + fmt::Debug {
    fn register_message_handler(
        &self,
        topic: &str,
        message_type: &str,
        handler: MessageHandler,
    ) -> SubscriptionId;

    fn remove_message_handler(&self, topic: &str, message_type: &str, subscription: SubscriptionId);
}

/// A shared handle to a bridge client, passed downstream on connect.
pub type BridgeHandle = Arc<dyn BridgeClient>;

/// The four command kinds that flow through the tree (§3).
#[derive(Clone)]
pub enum Command {
    RosbridgeConnect(BridgeHandle),
    RosbridgeDisconnect,
    StatusChange,
    StopSimulation,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::RosbridgeConnect(_) => write!(f, "RosbridgeConnect(..)"),
            Command::RosbridgeDisconnect => write!(f, "RosbridgeDisconnect"),
            Command::StatusChange => write!(f, "StatusChange"),
            Command::StopSimulation => write!(f, "StopSimulation"),
        }
    }
}
