//! Task representation and execution.

use super::handle::ResultHandle;
use super::panic_handler;
use crate::error::{BoxError, Error, Result};
use crate::scheduler::{PriorityClass, Weight};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// A boxed unit of work.
pub type BoxedWork<V> = Box<dyn FnOnce() -> std::result::Result<V, BoxError> + Send + 'static>;

/// A unit of work bound to a priority class and the handle that will receive
/// its outcome.
pub struct Task<V> {
    id: TaskId,
    work: BoxedWork<V>,
    class: PriorityClass,
    handle: ResultHandle<V>,
    created: Instant,
}

impl<V: Send + 'static> Task<V> {
    /// Create a task with the unspecified (lowest) class.
    pub fn create<F, E>(f: F) -> Self
    where
        F: FnOnce() -> std::result::Result<V, E> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::with_class(f, PriorityClass::UNSPECIFIED)
    }

    /// Create a task with a specific class.
    pub fn with_class<F, E>(f: F, class: impl Into<PriorityClass>) -> Self
    where
        F: FnOnce() -> std::result::Result<V, E> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::from_work(Box::new(move || f().map_err(Into::into)), class.into())
    }

    /// Create a task from work that may be absent.
    pub fn from_boxed(work: Option<BoxedWork<V>>, class: impl Into<PriorityClass>) -> Result<Self> {
        let work = work.ok_or(Error::NullArgument)?;
        Ok(Self::from_work(work, class.into()))
    }

    pub fn builder() -> TaskBuilder<V> {
        TaskBuilder::new()
    }

    fn from_work(work: BoxedWork<V>, class: PriorityClass) -> Self {
        Task {
            id: TaskId::next(),
            work,
            class,
            handle: ResultHandle::new(),
            created: Instant::now(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn class(&self) -> PriorityClass {
        self.class
    }

    pub fn weight(&self) -> Weight {
        self.class.weight()
    }

    pub fn created(&self) -> Instant {
        self.created
    }

    /// Handle to this task's outcome. Clones share the same slot.
    pub fn handle(&self) -> ResultHandle<V> {
        self.handle.clone()
    }

    /// Erase the result type so the task can sit in a shared queue.
    pub(crate) fn into_job(self) -> Job {
        let Task {
            id,
            work,
            class,
            handle,
            created,
        } = self;

        let run = Box::new(move || {
            if !handle.begin() {
                return RunOutcome::Skipped;
            }
            match panic_handler::catch(work) {
                Ok(Ok(value)) => {
                    handle.complete(value);
                    RunOutcome::Completed
                }
                Ok(Err(err)) => {
                    let err = Error::failed(err);
                    let message = err.to_string();
                    handle.fail(err);
                    RunOutcome::Failed(message)
                }
                Err(info) => {
                    handle.fail(Error::Panicked(info.message.clone()));
                    RunOutcome::Panicked(info.message)
                }
            }
        });

        Job {
            id,
            class,
            created,
            run,
        }
    }
}

impl<V> std::fmt::Debug for Task<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("class", &self.class)
            .field("handle", &self.handle)
            .finish()
    }
}

/// Builder for [`Task`]. Building without work fails with
/// [`Error::NullArgument`].
pub struct TaskBuilder<V> {
    work: Option<BoxedWork<V>>,
    class: PriorityClass,
}

impl<V: Send + 'static> TaskBuilder<V> {
    pub fn new() -> Self {
        Self {
            work: None,
            class: PriorityClass::UNSPECIFIED,
        }
    }

    pub fn work<F, E>(mut self, f: F) -> Self
    where
        F: FnOnce() -> std::result::Result<V, E> + Send + 'static,
        E: Into<BoxError>,
    {
        self.work = Some(Box::new(move || f().map_err(Into::into)));
        self
    }

    pub fn class(mut self, class: impl Into<PriorityClass>) -> Self {
        self.class = class.into();
        self
    }

    pub fn build(self) -> Result<Task<V>> {
        Task::from_boxed(self.work, self.class)
    }
}

impl<V> std::fmt::Debug for TaskBuilder<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBuilder")
            .field("has_work", &self.work.is_some())
            .field("class", &self.class)
            .finish()
    }
}

impl<V: Send + 'static> Default for TaskBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// How a queued job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    Completed,
    Failed(String),
    Panicked(String),
    /// Handle was already terminal when the worker reached it.
    Skipped,
}

impl RunOutcome {
    pub(crate) fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed(_) | RunOutcome::Panicked(_))
    }
}

/// Type-erased task as stored in the executor's queue.
pub(crate) struct Job {
    pub(crate) id: TaskId,
    pub(crate) class: PriorityClass,
    pub(crate) created: Instant,
    run: Box<dyn FnOnce() -> RunOutcome + Send + 'static>,
}

impl Job {
    pub(crate) fn run(self) -> RunOutcome {
        (self.run)()
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("class", &self.class)
            .finish()
    }
}
