//! Counting semaphore with a maximum count.
//!
//! The count mirrors the number of pending requests: producers release it once per enqueued
//! request, the consumer acquires it once per dequeued request.

use std::sync::{Condvar, Mutex, PoisonError};

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct SemaphoreOverflow;

struct State {
    count: usize,
    closed: bool,
}

pub(crate) struct Semaphore {
    state: Mutex<State>,
    available: Condvar,
    max: usize,
}

impl Semaphore {
    pub(crate) fn new(initial: usize, max: usize) -> Self {
        Self {
            state: Mutex::new(State {
                count: initial.min(max),
                closed: false,
            }),
            available: Condvar::new(),
            max,
        }
    }

    /// Increments the count and wakes one waiter.
    pub(crate) fn release(&self) -> Result<(), SemaphoreOverflow> {
        // No code panics while holding the state lock, poisoning is ignored.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.count >= self.max {
            return Err(SemaphoreOverflow);
        }
        state.count += 1;
        self.available.notify_one();
        Ok(())
    }

    /// Waits until the count is positive and decrements it.
    ///
    /// Returns `false` once the semaphore is closed and its count has dropped to zero.
    pub(crate) fn acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if state.count > 0 {
                state.count -= 1;
                return true;
            }
            if state.closed {
                return false;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Lets waiters drain the remaining count, then makes [`acquire`](Self::acquire) return
    /// `false`.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        self.available.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .count
    }
}
