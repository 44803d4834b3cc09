//! Scheduling policy: priority classes, the pending-work queue and in-flight
//! accounting.

pub mod accounting;
pub mod priority;
pub mod queue;

pub use accounting::PriorityAccounting;
pub use priority::{weight_of, PriorityClass, TaskType, Weight};
pub use queue::PriorityQueue;
