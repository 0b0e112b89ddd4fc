//! Prevention pattern: anterior forbids a subsequent posterior; violation
//! is a permanent point of no return (§4.9).
//! Grounded on `rigelcore/simulations/requirements/prevention.py`.

use crate::scheduler::TimerToken;
use std::time::Duration;

/// Construction-time parameters, independent of runtime state (teacher's
/// `NodeConfig` style).
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct PreventionConfig {
    pub timeout: Option<Duration>,
}

pub struct PreventionState {
    pub satisfied: bool,
    pub listening: bool,
    pub timeout: Option<Duration>,
    pub timer: Option<TimerToken>,
    /// Set once the violating witness (anterior ∧ posterior) has been seen;
    /// after this, no further recompute may change `satisfied`.
    pub violated: bool,
}

impl PreventionState {
    pub fn new(timeout: Option<Duration>) -> Self {
        PreventionState {
            satisfied: false,
            listening: false,
            timeout,
            timer: None,
            violated: false,
        }
    }

    pub fn config(&self) -> PreventionConfig {
        PreventionConfig {
            timeout: self.timeout,
        }
    }
}

impl std::fmt::Debug for PreventionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreventionState")
            .field("satisfied", &self.satisfied)
            .field("listening", &self.listening)
            .field("timeout", &self.timeout)
            .field("violated", &self.violated)
            .finish()
    }
}
