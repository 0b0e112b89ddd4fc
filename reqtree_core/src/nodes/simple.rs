//! Leaf node: subscribes to one topic and applies a predicate (§4.3).
//! Grounded on `rigelcore/simulations/requirements/simple.py`.

use crate::command::{BridgeHandle, SubscriptionId};
use crate::nodes::Predicate;

pub struct SimpleState {
    pub topic: String,
    pub message_type: String,
    pub predicate: Predicate,
    pub satisfied: bool,
    pub listening: bool,
    pub subscription: Option<SubscriptionId>,
    /// The bridge the subscription was registered with, kept so disconnect
    /// can call back into the same client.
    pub bridge: Option<BridgeHandle>,
}

impl SimpleState {
    pub fn new(topic: String, message_type: String, predicate: Predicate) -> Self {
        SimpleState {
            topic,
            message_type,
            predicate,
            satisfied: false,
            listening: false,
            subscription: None,
            bridge: None,
        }
    }
}

impl std::fmt::Debug for SimpleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleState")
            .field("topic", &self.topic)
            .field("message_type", &self.message_type)
            .field("satisfied", &self.satisfied)
            .field("listening", &self.listening)
            .field("subscription", &self.subscription)
            .finish()
    }
}
