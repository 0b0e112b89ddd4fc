//! Existence pattern: one child, becomes satisfied exactly when the child
//! does, within an optional deadline (§4.5).
//! Grounded on `rigelcore/simulations/requirements/existence.py`.

use crate::scheduler::TimerToken;
use std::time::Duration;

/// Construction-time parameters, independent of runtime state, in the
/// teacher's `NodeConfig` style (a small `Clone + Debug` struct a host
/// can introspect or use to rebuild a node).
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct ExistenceConfig {
    pub timeout: Option<Duration>,
}

pub struct ExistenceState {
    pub satisfied: bool,
    pub listening: bool,
    pub timeout: Option<Duration>,
    pub timer: Option<TimerToken>,
}

impl ExistenceState {
    pub fn new(timeout: Option<Duration>) -> Self {
        ExistenceState {
            satisfied: false,
            listening: false,
            timeout,
            timer: None,
        }
    }

    pub fn config(&self) -> ExistenceConfig {
        ExistenceConfig {
            timeout: self.timeout,
        }
    }
}

impl std::fmt::Debug for ExistenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExistenceState")
            .field("satisfied", &self.satisfied)
            .field("listening", &self.listening)
            .field("timeout", &self.timeout)
            .finish()
    }
}
