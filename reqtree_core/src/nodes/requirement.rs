//! Requirement pattern: posterior is a precondition of anterior; children
//! are addressed in reversed order (index 0 = posterior, index 1 =
//! anterior) but both connect at once, unlike Response (§4.8).
//! Grounded on `rigelcore/simulations/requirements/requirement.py`.

use crate::scheduler::TimerToken;
use std::time::Duration;

/// Construction-time parameters, independent of runtime state (teacher's
/// `NodeConfig` style).
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct RequirementConfig {
    pub timeout: Option<Duration>,
}

pub struct RequirementState {
    pub satisfied: bool,
    pub listening: bool,
    pub timeout: Option<Duration>,
    pub timer: Option<TimerToken>,
}

impl RequirementState {
    pub fn new(timeout: Option<Duration>) -> Self {
        RequirementState {
            satisfied: false,
            listening: false,
            timeout,
            timer: None,
        }
    }

    pub fn config(&self) -> RequirementConfig {
        RequirementConfig {
            timeout: self.timeout,
        }
    }
}

impl std::fmt::Debug for RequirementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequirementState")
            .field("satisfied", &self.satisfied)
            .field("listening", &self.listening)
            .field("timeout", &self.timeout)
            .finish()
    }
}
