//! Response pattern: anterior must become satisfied before posterior ever
//! does; posterior is connected only once the anterior fires (§4.7).
//! Grounded on `rigelcore/simulations/requirements/response.py`.

use crate::command::BridgeHandle;
use crate::scheduler::TimerToken;
use std::time::Duration;

/// Construction-time parameters, independent of runtime state (teacher's
/// `NodeConfig` style).
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct ResponseConfig {
    pub timeout: Option<Duration>,
}

pub struct ResponseState {
    // Vacuous: no witness yet.
    pub satisfied: bool,
    /// Set once a real child transition or this node's own timeout has
    /// been observed. Guards the manager's start-timer assessment from
    /// mistaking the initial vacuous `satisfied` for a genuine outcome.
    pub witnessed: bool,
    pub listening: bool,
    pub timeout: Option<Duration>,
    pub timer: Option<TimerToken>,
    /// The connect command saved at `RosbridgeConnect` time, replayed to
    /// the posterior once the anterior first satisfies.
    pub saved_connect: Option<BridgeHandle>,
}

impl ResponseState {
    pub fn new(timeout: Option<Duration>) -> Self {
        ResponseState {
            satisfied: true,
            witnessed: false,
            listening: false,
            timeout,
            timer: None,
            saved_connect: None,
        }
    }

    pub fn config(&self) -> ResponseConfig {
        ResponseConfig {
            timeout: self.timeout,
        }
    }
}

impl std::fmt::Debug for ResponseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseState")
            .field("satisfied", &self.satisfied)
            .field("witnessed", &self.witnessed)
            .field("listening", &self.listening)
            .field("timeout", &self.timeout)
            .finish()
    }
}
