//! Executor metrics.

pub mod metrics;

pub use metrics::{Metrics, MetricsSnapshot};
