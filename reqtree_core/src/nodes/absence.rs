//! Absence pattern: one child, vacuously satisfied, monotonically flips to
//! false the instant the child is ever satisfied (§4.6).
//! Grounded on `rigelcore/simulations/requirements/absence.py`.

use crate::scheduler::TimerToken;
use std::time::Duration;

/// Construction-time parameters, independent of runtime state (teacher's
/// `NodeConfig` style).
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct AbsenceConfig {
    pub timeout: Option<Duration>,
}

pub struct AbsenceState {
    pub satisfied: bool,
    /// Set once a real child transition or this node's own timeout has
    /// been observed. Guards the manager's start-timer assessment from
    /// mistaking the initial vacuous `satisfied` for a genuine outcome.
    pub witnessed: bool,
    pub listening: bool,
    pub timeout: Option<Duration>,
    pub timer: Option<TimerToken>,
}

impl AbsenceState {
    pub fn new(timeout: Option<Duration>) -> Self {
        AbsenceState {
            // By default an absence requirement is considered satisfied;
            // a later witness from the child is what can falsify it.
            satisfied: true,
            witnessed: false,
            listening: false,
            timeout,
            timer: None,
        }
    }

    pub fn config(&self) -> AbsenceConfig {
        AbsenceConfig {
            timeout: self.timeout,
        }
    }
}

impl std::fmt::Debug for AbsenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbsenceState")
            .field("satisfied", &self.satisfied)
            .field("witnessed", &self.witnessed)
            .field("listening", &self.listening)
            .field("timeout", &self.timeout)
            .finish()
    }
}
