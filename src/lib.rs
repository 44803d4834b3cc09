//! Priority Executor
//!
//! A bounded worker pool that runs submitted work lowest-weight first instead
//! of first-in-first-out, and hands back a [`ResultHandle`] per submission.
//!
//! # Quick Start
//!
//! ```no_run
//! use priority_executor::prelude::*;
//! use std::time::Duration;
//!
//! let config = Config::builder().fixed_threads(2).build().unwrap();
//! let executor = PriorityExecutor::new(config).unwrap();
//!
//! let sum = executor
//!     .submit(|| Ok::<_, BoxError>((1..=10).sum::<i32>()), TaskType::Computational)
//!     .unwrap();
//! let text = executor
//!     .submit(|| Ok::<_, BoxError>("ZYX".chars().rev().collect::<String>()), TaskType::Io)
//!     .unwrap();
//!
//! assert_eq!(sum.get_timeout(Duration::from_secs(1)).unwrap(), 55);
//! assert_eq!(text.get().unwrap(), "XYZ");
//!
//! executor.shutdown();
//! ```
//!
//! # Model
//!
//! - **Priority classes**: caller-supplied [`PriorityClass`] values; lower
//!   weight runs earlier, equal weights run in submission order.
//! - **Result handles**: write-once slots with blocking, timed and
//!   non-blocking reads plus pre-start cancellation.
//! - **Current extreme priority**: the lowest weight still queued or running,
//!   see [`PriorityExecutor::current_extreme_priority`].
//! - **Failures**: errors and panics from a unit of work land in its handle;
//!   workers survive them. Optionally the pool shuts itself down on the first
//!   failure ([`ConfigBuilder::auto_terminate`]).
//!
//! Diagnostics are emitted through [`tracing`]; install a subscriber to see
//! them.

#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod scheduler;
pub mod telemetry;

pub use config::{Config, ConfigBuilder};
pub use error::{BoxError, Error, Result, TaskError};
pub use executor::{PriorityExecutor, ResultHandle, Task, TaskBuilder};
pub use scheduler::{weight_of, PriorityClass, TaskType, Weight};
