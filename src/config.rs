use crate::error::{Error, Result};
use crate::executor::PanicStrategy;
use crate::scheduler::{PriorityClass, Weight};
use std::time::Duration;

/// Upper bound on pool size.
pub const MAX_THREADS_LIMIT: usize = 1024;

/// Weight reported by `current_extreme_priority` when nothing is in flight.
pub const DEFAULT_IDLE_WEIGHT: Weight = Weight::MAX;

#[derive(Debug, Clone)]
pub struct Config {
    pub core_threads: usize,
    pub max_threads: usize,
    /// How long a worker above `core_threads` may sit idle before exiting.
    pub idle_timeout: Duration,
    /// Class for work submitted without one.
    pub default_class: PriorityClass,
    pub idle_weight: Weight,
    /// Shut the pool down when any unit of work fails or panics.
    pub auto_terminate: bool,
    pub panic_strategy: PanicStrategy,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        let cpus = num_cpus::get();
        Self {
            core_threads: cpus / 2,
            max_threads: cpus.saturating_sub(1).max(1),
            idle_timeout: Duration::from_millis(300),
            default_class: PriorityClass::UNSPECIFIED,
            idle_weight: DEFAULT_IDLE_WEIGHT,
            auto_terminate: false,
            panic_strategy: PanicStrategy::default(),
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "prio-worker".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_threads == 0 {
            return Err(Error::config("max_threads must be > 0"));
        }
        if self.max_threads > MAX_THREADS_LIMIT {
            return Err(Error::config(format!(
                "max_threads too large (max {})",
                MAX_THREADS_LIMIT
            )));
        }
        if self.max_threads < self.core_threads {
            return Err(Error::config(format!(
                "max_threads ({}) must be >= core_threads ({})",
                self.max_threads, self.core_threads
            )));
        }
        if self.idle_weight < self.default_class.weight() {
            return Err(Error::config(format!(
                "idle_weight {} outranks default class {}; lower the default class too",
                self.idle_weight, self.default_class
            )));
        }
        if let Some(0) = self.stack_size {
            return Err(Error::config("stack_size must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn core_threads(mut self, n: usize) -> Self {
        self.config.core_threads = n;
        self
    }

    pub fn max_threads(mut self, n: usize) -> Self {
        self.config.max_threads = n;
        self
    }

    /// Set both core and max to `n`.
    pub fn fixed_threads(self, n: usize) -> Self {
        self.core_threads(n).max_threads(n)
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn default_class(mut self, class: impl Into<PriorityClass>) -> Self {
        self.config.default_class = class.into();
        self
    }

    /// Weight reported by the current-extreme reading when nothing is in
    /// flight. It must not be lower than the default class weight, and the
    /// stock default class sits at `Weight::MAX - 1`, so a small idle weight
    /// such as 11 also needs `default_class`, e.g. `TaskType::Other`.
    pub fn idle_weight(mut self, weight: Weight) -> Self {
        self.config.idle_weight = weight;
        self
    }

    pub fn auto_terminate(mut self, enable: bool) -> Self {
        self.config.auto_terminate = enable;
        self
    }

    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
