//! Root node state: orchestrates start/stop deadlines and the overall
//! `finished` signal (§4.10).
//! Grounded on `rigelcore/simulations/requirements/manager.py`.

use crate::scheduler::TimerToken;
use std::time::Duration;

pub struct ManagerState {
    pub satisfied: bool,
    pub listening: bool,
    pub finished: bool,
    pub max_timeout: Duration,
    pub min_timeout: Duration,
    pub start_timer: Option<TimerToken>,
    pub stop_timer: Option<TimerToken>,
}

impl ManagerState {
    pub fn new(max_timeout: Duration, min_timeout: Duration) -> Self {
        ManagerState {
            // Never initialised in the source; treated as false (§9 open question).
            satisfied: false,
            listening: false,
            finished: false,
            max_timeout,
            min_timeout,
            start_timer: None,
            stop_timer: None,
        }
    }
}

impl std::fmt::Debug for ManagerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerState")
            .field("satisfied", &self.satisfied)
            .field("finished", &self.finished)
            .field("max_timeout", &self.max_timeout)
            .field("min_timeout", &self.min_timeout)
            .finish()
    }
}
