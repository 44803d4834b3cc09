//! Single-assignment result slot shared between a worker and observers.

use super::worker;
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs once, when the handle first turns terminal. It runs under the handle
/// lock, so nobody observes the outcome before it has finished.
pub(crate) type ReleaseHook = Box<dyn FnOnce() + Send + 'static>;

/// Observable lifecycle of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl HandleState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, HandleState::Pending | HandleState::Running)
    }
}

enum Slot<V> {
    Pending,
    Running,
    Completed(V),
    Failed(Error),
    Cancelled,
}

impl<V> Slot<V> {
    fn state(&self) -> HandleState {
        match self {
            Slot::Pending => HandleState::Pending,
            Slot::Running => HandleState::Running,
            Slot::Completed(_) => HandleState::Completed,
            Slot::Failed(_) => HandleState::Failed,
            Slot::Cancelled => HandleState::Cancelled,
        }
    }
}

impl<V: Clone> Slot<V> {
    fn outcome(&self) -> Option<Result<V>> {
        match self {
            Slot::Pending | Slot::Running => None,
            Slot::Completed(v) => Some(Ok(v.clone())),
            Slot::Failed(e) => Some(Err(e.clone())),
            Slot::Cancelled => Some(Err(Error::Cancelled)),
        }
    }
}

struct State<V> {
    slot: Slot<V>,
    on_release: Option<ReleaseHook>,
}

struct Inner<V> {
    state: Mutex<State<V>>,
    done: Condvar,
}

/// Handle to the eventual outcome of a task.
///
/// The slot is written at most once. Clones share the same slot, so any
/// number of threads may wait on it.
pub struct ResultHandle<V> {
    inner: Arc<Inner<V>>,
}

impl<V> ResultHandle<V> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    slot: Slot::Pending,
                    on_release: None,
                }),
                done: Condvar::new(),
            }),
        }
    }

    pub fn state(&self) -> HandleState {
        self.inner.state.lock().slot.state()
    }

    pub fn is_done(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == HandleState::Cancelled
    }

    /// Store `value` if nothing has been stored yet. Returns whether this call
    /// performed the transition.
    pub fn complete(&self, value: V) -> bool {
        self.finish(Slot::Completed(value))
    }

    /// Store `error` if nothing has been stored yet.
    pub fn fail(&self, error: Error) -> bool {
        self.finish(Slot::Failed(error))
    }

    /// Cancel the task if no worker has started it yet.
    ///
    /// Running work is never interrupted; in that case this returns `false`
    /// and the handle will still receive the task's outcome.
    pub fn cancel(&self) -> bool {
        let state = self.inner.state.lock();
        if !matches!(state.slot, Slot::Pending) {
            return false;
        }
        self.settle(state, Slot::Cancelled);
        true
    }

    fn finish(&self, slot: Slot<V>) -> bool {
        let state = self.inner.state.lock();
        if state.slot.state().is_terminal() {
            return false;
        }
        self.settle(state, slot);
        true
    }

    // Store the outcome and release the executor's bookkeeping before any
    // waiter can see it.
    fn settle(&self, mut state: MutexGuard<'_, State<V>>, slot: Slot<V>) {
        state.slot = slot;
        if let Some(hook) = state.on_release.take() {
            hook();
        }
        drop(state);
        self.inner.done.notify_all();
    }

    /// Install the hook fired when the handle turns terminal.
    /// Fails if the handle already left `Pending`.
    pub(crate) fn attach_release(&self, hook: ReleaseHook) -> bool {
        let mut state = self.inner.state.lock();
        if !matches!(state.slot, Slot::Pending) {
            return false;
        }
        state.on_release = Some(hook);
        true
    }

    /// Claim the task for execution. Returns `false` if it was cancelled or
    /// completed externally while queued.
    pub(crate) fn begin(&self) -> bool {
        let mut state = self.inner.state.lock();
        if !matches!(state.slot, Slot::Pending) {
            return false;
        }
        state.slot = Slot::Running;
        true
    }

    /// Block until the handle is terminal, without reading the value.
    pub fn wait(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        while !state.slot.state().is_terminal() {
            if worker::is_worker_thread() {
                return Err(Error::WouldBlockWorker);
            }
            self.inner.done.wait(&mut state);
        }
        Ok(())
    }
}

impl<V: Clone> ResultHandle<V> {
    /// Block until the task finishes and return its outcome.
    pub fn get(&self) -> Result<V> {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(outcome) = state.slot.outcome() {
                return outcome;
            }
            if worker::is_worker_thread() {
                return Err(Error::WouldBlockWorker);
            }
            self.inner.done.wait(&mut state);
        }
    }

    /// Like [`get`](Self::get) but gives up after `timeout` with
    /// [`Error::TimedOut`]. Timing out leaves the task untouched.
    pub fn get_timeout(&self, timeout: Duration) -> Result<V> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.get();
        };
        let mut state = self.inner.state.lock();
        loop {
            if let Some(outcome) = state.slot.outcome() {
                return outcome;
            }
            if worker::is_worker_thread() {
                return Err(Error::WouldBlockWorker);
            }
            if self.inner.done.wait_until(&mut state, deadline).timed_out() {
                return state.slot.outcome().unwrap_or(Err(Error::TimedOut));
            }
        }
    }

    /// Outcome if already available.
    pub fn try_get(&self) -> Option<Result<V>> {
        self.inner.state.lock().slot.outcome()
    }
}

impl<V> Clone for ResultHandle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Default for ResultHandle<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for ResultHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultHandle")
            .field("state", &self.state())
            .finish()
    }
}
