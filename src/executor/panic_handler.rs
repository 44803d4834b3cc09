use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// What a worker does after a unit of work panics. The panic is always
/// delivered to the task's handle; the worker always survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicStrategy {
    /// Deliver to the handle only.
    Isolate,
    /// Deliver to the handle and emit a warning event.
    #[default]
    LogAndContinue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicInfo {
    pub message: String,
}

impl PanicInfo {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        Self { message }
    }
}

/// Run `f`, turning an unwind into a [`PanicInfo`].
pub(crate) fn catch<F, R>(f: F) -> Result<R, PanicInfo>
where
    F: FnOnce() -> R,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(PanicInfo::from_payload)
}
