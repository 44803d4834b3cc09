use std::fmt;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error type accepted from units of work.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("unit of work is missing")]
    NullArgument,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("executor is shut down, submission rejected")]
    RejectedExecution,

    #[error("timed out waiting for task result")]
    TimedOut,

    #[error("task was cancelled")]
    Cancelled,

    #[error("refusing to block a worker thread on a pending result")]
    WouldBlockWorker,

    #[error("failed to spawn worker: {0}")]
    Spawn(String),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task failed: {0}")]
    Failed(#[from] TaskError),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::InvalidConfiguration(msg.into())
    }

    pub fn spawn<S: Into<String>>(msg: S) -> Self {
        Error::Spawn(msg.into())
    }

    /// Wrap a unit-of-work failure.
    pub fn failed<E: Into<BoxError>>(err: E) -> Self {
        Error::Failed(TaskError::new(err))
    }

    /// True when the error came from running the unit of work itself rather
    /// than from the executor.
    pub fn is_task_failure(&self) -> bool {
        matches!(self, Error::Failed(_) | Error::Panicked(_))
    }
}

/// Failure returned by a unit of work.
///
/// Shared behind an `Arc` so every observer of a handle receives the same
/// error.
#[derive(Clone)]
pub struct TaskError(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl TaskError {
    pub fn new<E: Into<BoxError>>(err: E) -> Self {
        TaskError(Arc::from(err.into()))
    }

    /// Borrow the underlying error.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }

    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Debug for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}
