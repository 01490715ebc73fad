//! Blocking FIFO queue shared by the worker pool and the metrics pipeline.
//!
//! Mirrors the mutex+condvar wait-queue pattern used elsewhere for
//! connection pools, but collapses the shutdown check and the emptiness
//! check into a single `wait_while` predicate so a `shutdown()` racing a
//! `pop()` can never be missed: the predicate is re-evaluated under the
//! same lock the shutdown flag is set under.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

struct State<T> {
    items: VecDeque<T>,
    shutdown: bool,
}

/// A strict-FIFO blocking queue. `pop` blocks until an item is available or
/// the queue has been shut down with nothing left to drain.
pub struct BlockingQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append to the back, waking exactly one waiter.
    pub fn push(&self, item: T) {
        let mut state = self.state.lock();
        state.items.push_back(item);
        self.available.notify_one();
    }

    /// Pop from the front, blocking until an item arrives or the queue is
    /// shut down with nothing left. Returns `None` only once drained after
    /// shutdown.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        self.available
            .wait_while(&mut state, |s| s.items.is_empty() && !s.shutdown);
        state.items.pop_front()
    }

    /// Signal shutdown and wake every waiter. Items already queued are
    /// still drainable by `pop` until exhausted.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        self.available.notify_all();
    }

    /// Drain whatever remains without blocking — used defensively during
    /// pool teardown, where the queue is expected to already be empty.
    pub fn drain(&self) -> Vec<T> {
        let mut state = self.state.lock();
        state.items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
