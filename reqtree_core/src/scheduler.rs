//! Timer scheduling (§5, §9: "a single scheduler thread driving a min-heap
//! of deadlines, with cancellable tokens, is simpler and cheaper than
//! per-timer threads").
//!
//! The teacher has no timer subsystem of its own; this module is grounded
//! directly on the spec's Design Note rather than on teacher code, using
//! the ordinary std-library building blocks (`BinaryHeap` + a condvar-driven
//! worker) rather than pulling in a timer-wheel crate the rest of the
//! corpus never reaches for.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Handle to an armed timer. Cancelling a token that already fired, or that
/// was never armed, is a harmless no-op (§5: "cancel-before-start as a
/// no-op").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

/// A scheduled deadline together with the callback to run when it elapses.
struct Deadline {
    at: Instant,
    token: TimerToken,
    callback: Box<dyn FnOnce() + Send>,
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.token == other.token
    }
}
impl Eq for Deadline {}
impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest deadline sorts first.
        other.at.cmp(&self.at)
    }
}

/// A source of one-shot, cancellable deadlines.
///
/// Implementations must treat `cancel` on an unknown or already-fired token
/// as a no-op, never an error (§5).
pub trait Scheduler: Send + Sync {
    /// Arm a one-shot timer that invokes `callback` after `delay`. Returns a
    /// token that can later be passed to `cancel`.
    fn arm(&self, delay: Duration, callback: Box<dyn FnOnce() + Send>) -> TimerToken;

    /// Cancel a previously armed timer. No-op if it already fired or is
    /// unknown.
    fn cancel(&self, token: TimerToken);
}

struct WorkerState {
    heap: BinaryHeap<Deadline>,
    cancelled: std::collections::HashSet<TimerToken>,
    shutdown: bool,
}

/// Production scheduler: a single background thread draining a min-heap of
/// deadlines (§9).
pub struct WallClockScheduler {
    state: Arc<(Mutex<WorkerState>, Condvar)>,
    next_token: AtomicU64,
    // Keep the worker thread's handle so the scheduler can be torn down
    // deterministically in tests that construct and drop one.
    _worker: Option<std::thread::JoinHandle<()>>,
}

impl WallClockScheduler {
    pub fn new() -> Self {
        let state = Arc::new((
            Mutex::new(WorkerState {
                heap: BinaryHeap::new(),
                cancelled: std::collections::HashSet::new(),
                shutdown: false,
            }),
            Condvar::new(),
        ));

        let worker_state = Arc::clone(&state);
        let worker = std::thread::Builder::new()
            .name("reqtree-scheduler".into())
            .spawn(move || Self::run(worker_state))
            .expect("failed to spawn scheduler thread");

        WallClockScheduler {
            state,
            next_token: AtomicU64::new(1),
            _worker: Some(worker),
        }
    }

    fn run(state: Arc<(Mutex<WorkerState>, Condvar)>) {
        let (lock, cvar) = &*state;
        loop {
            let mut guard = lock.lock().unwrap();
            loop {
                if guard.shutdown {
                    return;
                }
                match guard.heap.peek() {
                    None => {
                        guard = cvar.wait(guard).unwrap();
                    }
                    Some(next) => {
                        let now = Instant::now();
                        if next.at <= now {
                            break;
                        }
                        let timeout = next.at - now;
                        let (g, _) = cvar.wait_timeout(guard, timeout).unwrap();
                        guard = g;
                    }
                }
            }
            let due = guard.heap.pop().expect("peeked Some above");
            let fire = !guard.cancelled.remove(&due.token);
            drop(guard);
            if fire {
                (due.callback)();
            }
        }
    }
}

impl Default for WallClockScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WallClockScheduler {
    fn drop(&mut self) {
        let (lock, cvar) = &*self.state;
        lock.lock().unwrap().shutdown = true;
        cvar.notify_all();
        if let Some(handle) = self._worker.take() {
            let _ = handle.join();
        }
    }
}

impl Scheduler for WallClockScheduler {
    fn arm(&self, delay: Duration, callback: Box<dyn FnOnce() + Send>) -> TimerToken {
        let token = TimerToken(self.next_token.fetch_add(1, AtomicOrdering::Relaxed));
        let (lock, cvar) = &*self.state;
        let mut guard = lock.lock().unwrap();
        guard.heap.push(Deadline {
            at: Instant::now() + delay,
            token,
            callback,
        });
        cvar.notify_all();
        token
    }

    fn cancel(&self, token: TimerToken) {
        let (lock, _cvar) = &*self.state;
        lock.lock().unwrap().cancelled.insert(token);
    }
}

/// Deterministic, test-only scheduler: timers never fire on their own. Tests
/// advance virtual time explicitly and assert on which tokens would have
/// elapsed, then invoke their callbacks directly.
///
/// This does not mirror anything in the teacher: an injectable scheduler is
/// the minimum machinery needed to write deterministic tests against the
/// deadline-driven patterns in §8's concrete scenarios.
pub struct ManualScheduler {
    inner: Mutex<ManualState>,
    next_token: AtomicU64,
}

struct ManualState {
    pending: Vec<(Duration, TimerToken, Option<Box<dyn FnOnce() + Send>>)>,
    cancelled: std::collections::HashSet<TimerToken>,
    now: Duration,
}

impl ManualScheduler {
    pub fn new() -> Self {
        ManualScheduler {
            inner: Mutex::new(ManualState {
                pending: Vec::new(),
                cancelled: std::collections::HashSet::new(),
                now: Duration::ZERO,
            }),
            next_token: AtomicU64::new(1),
        }
    }

    /// Advance virtual time, firing (in deadline order) every armed,
    /// non-cancelled timer whose deadline is now due.
    pub fn advance(&self, by: Duration) {
        let mut due = Vec::new();
        {
            let mut guard = self.inner.lock().unwrap();
            guard.now += by;
            let now = guard.now;
            let mut remaining = Vec::new();
            for (at, token, cb) in guard.pending.drain(..) {
                if at <= now && !guard.cancelled.contains(&token) {
                    due.push((at, token, cb));
                } else {
                    remaining.push((at, token, cb));
                }
            }
            guard.pending = remaining;
            due.sort_by_key(|(at, _, _)| *at);
        }
        for (_, _, cb) in due {
            if let Some(cb) = cb {
                cb();
            }
        }
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn arm(&self, delay: Duration, callback: Box<dyn FnOnce() + Send>) -> TimerToken {
        let token = TimerToken(self.next_token.fetch_add(1, AtomicOrdering::Relaxed));
        let mut guard = self.inner.lock().unwrap();
        let at = guard.now + delay;
        guard.pending.push((at, token, Some(callback)));
        token
    }

    fn cancel(&self, token: TimerToken) {
        self.inner.lock().unwrap().cancelled.insert(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn manual_scheduler_fires_due_timers_in_order() {
        let sched = ManualScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = Arc::clone(&order);
        sched.arm(Duration::from_secs(2), Box::new(move || o1.lock().unwrap().push(2)));
        let o2 = Arc::clone(&order);
        sched.arm(Duration::from_secs(1), Box::new(move || o2.lock().unwrap().push(1)));

        sched.advance(Duration::from_secs(3));
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn manual_scheduler_cancel_suppresses_callback() {
        let sched = ManualScheduler::new();
        let fired = Arc::new(AtomicBool::new(false));
        let f = Arc::clone(&fired);
        let token = sched.arm(Duration::from_secs(1), Box::new(move || f.store(true, AtomicOrdering::SeqCst)));
        sched.cancel(token);
        sched.advance(Duration::from_secs(5));
        assert!(!fired.load(AtomicOrdering::SeqCst));
    }

    #[test]
    fn manual_scheduler_cancel_unknown_token_is_noop() {
        let sched = ManualScheduler::new();
        sched.cancel(TimerToken(9999));
    }
}
