//! Reusable count-down completion latch.
//!
//! Generalizes the node-level mutex+condition+counter the original engine
//! open-coded on every `RDD` into one small primitive: set a goal once,
//! have workers `arrive()` as they finish, and let any thread `wait()` for
//! the goal to be reached. Exactly the arrival that makes `count == goal`
//! flips `complete` and broadcasts; every later arrival (there should be
//! none — the goal bounds task count) is a no-op past that point.

use parking_lot::{Condvar, Mutex};

struct State {
    goal: usize,
    count: usize,
    complete: bool,
}

pub struct Latch {
    state: Mutex<State>,
    condvar: Condvar,
}

impl Latch {
    /// A latch with no goal set yet (`INIT`).
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                goal: 0,
                count: 0,
                complete: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Move from `INIT`/`PLANNED` to `PLANNED` with the given goal. A goal
    /// of zero is immediately complete (used for `SOURCE` nodes).
    pub fn set_goal(&self, goal: usize) {
        let mut state = self.state.lock();
        state.goal = goal;
        state.count = 0;
        if goal == 0 {
            state.complete = true;
            self.condvar.notify_all();
        } else {
            state.complete = false;
        }
    }

    /// Lower the goal by one, e.g. when a planned task could not be
    /// submitted. If the new goal is already met, completes the latch.
    pub fn decrement_goal(&self) {
        let mut state = self.state.lock();
        if state.goal > 0 {
            state.goal -= 1;
        }
        if !state.complete && state.count >= state.goal {
            state.complete = true;
            self.condvar.notify_all();
        }
    }

    /// Record one task's completion. Returns `true` if this call is the
    /// one that completed the latch.
    pub fn arrive(&self) -> bool {
        let mut state = self.state.lock();
        if state.complete {
            // Defensive: an internal invariant violation, never expected
            // since the goal bounds submitted task count.
            tracing::error!("latch arrival observed after completion");
            return false;
        }
        state.count += 1;
        if state.count >= state.goal {
            state.complete = true;
            self.condvar.notify_all();
            true
        } else {
            false
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state.lock().complete
    }

    /// Block until `complete` is true.
    pub fn wait(&self) {
        let mut state = self.state.lock();
        self.condvar.wait_while(&mut state, |s| !s.complete);
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn completes_exactly_on_goal() {
        let latch = Latch::new();
        latch.set_goal(3);
        assert!(!latch.arrive());
        assert!(!latch.arrive());
        assert!(latch.arrive());
        assert!(latch.is_complete());
    }

    #[test]
    fn zero_goal_is_immediately_complete() {
        let latch = Latch::new();
        latch.set_goal(0);
        assert!(latch.is_complete());
    }

    #[test]
    fn decrement_goal_can_complete_latch() {
        let latch = Latch::new();
        latch.set_goal(2);
        assert!(!latch.arrive());
        assert!(!latch.is_complete());
        latch.decrement_goal();
        assert!(latch.is_complete());
    }

    #[test]
    fn waiters_wake_on_completion() {
        let latch = Arc::new(Latch::new());
        latch.set_goal(1);
        let l2 = latch.clone();
        let handle = thread::spawn(move || l2.wait());
        latch.arrive();
        handle.join().unwrap();
        assert!(latch.is_complete());
    }
}
