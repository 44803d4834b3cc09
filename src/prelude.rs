pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{BoxError, Error, Result, TaskError};
pub use crate::executor::{PriorityExecutor, ResultHandle, Task};
pub use crate::scheduler::{PriorityClass, TaskType, Weight};
