//! Blocking rendezvous between a caller thread and a transport completion.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Result, WorkerErr};

#[derive(Debug, Default)]
struct BarrierState {
    valid: bool,
    released: bool,
}

/// A one-shot barrier: blocks callers until it is released, then never blocks again.
///
/// The releasing side may mark the state valid first, telling the waiters that the awaited
/// event actually happened rather than failed.
#[derive(Debug, Default)]
pub struct StateBarrier {
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl StateBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state_valid(&self) {
        self.state.lock().valid = true;
    }

    /// Releases every current and future waiter.
    pub fn try_unblock(&self) {
        self.state.lock().released = true;
        self.cvar.notify_all();
    }

    /// Blocks until the barrier is released.
    ///
    /// # Returns
    /// Whether the state was marked valid before the release.
    pub fn block(&self) -> bool {
        let mut state = self.state.lock();
        while !state.released {
            self.cvar.wait(&mut state);
        }

        state.valid
    }

    /// Blocks until the barrier is released or `timeout` elapses.
    ///
    /// # Returns
    /// `None` on timeout, otherwise whether the state was marked valid.
    pub fn block_for(&self, timeout: Duration) -> Option<bool> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        while !state.released {
            if self.cvar.wait_until(&mut state, deadline).timed_out() {
                return state.released.then_some(state.valid);
            }
        }

        Some(state.valid)
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }
}

/// Carries the outcome of one request from the transport callback to the blocked caller.
#[derive(Debug)]
pub struct Rendezvous<T> {
    barrier: StateBarrier,
    outcome: Mutex<Option<Result<T>>>,
}

impl<T> Rendezvous<T> {
    pub fn new() -> Self {
        Self {
            barrier: StateBarrier::new(),
            outcome: Mutex::new(None),
        }
    }

    /// Stores `outcome` and releases the waiter, called once by the completion callback.
    pub fn complete(&self, outcome: Result<T>) {
        if outcome.is_ok() {
            self.barrier.set_state_valid();
        }

        *self.outcome.lock() = Some(outcome);
        self.barrier.try_unblock();
    }

    /// Blocks until the outcome is available and takes it.
    pub fn wait(&self) -> Result<T> {
        self.barrier.block();
        self.take()
    }

    /// Like `wait`, giving up after `timeout`.
    ///
    /// # Returns
    /// `None` on timeout, the outcome stays in place for a later wait.
    pub fn wait_for(&self, timeout: Duration) -> Option<Result<T>> {
        self.barrier.block_for(timeout).map(|_| self.take())
    }

    fn take(&self) -> Result<T> {
        self.outcome.lock().take().unwrap_or(Err(WorkerErr::Disconnected))
    }
}

impl<T> Default for Rendezvous<T> {
    fn default() -> Self {
        Self::new()
    }
}
