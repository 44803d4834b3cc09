//! Task execution infrastructure.
//!
//! This module provides the executor, its worker threads, tasks and the
//! result handles callers wait on.

pub mod handle;
pub mod panic_handler;
pub mod pool;
pub mod task;
pub mod worker;

pub use handle::{HandleState, ResultHandle};
pub use panic_handler::{PanicInfo, PanicStrategy};
pub use pool::{ExecutorStats, Lifecycle, PriorityExecutor};
pub use task::{BoxedWork, Task, TaskBuilder, TaskId};
pub use worker::is_worker_thread;
