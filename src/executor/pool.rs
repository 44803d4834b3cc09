use super::handle::ResultHandle;
use super::task::{BoxedWork, Job, Task};
use super::worker::{self, WorkerId};
use crate::config::Config;
use crate::error::{BoxError, Error, Result};
use crate::scheduler::{PriorityAccounting, PriorityClass, PriorityQueue, Weight};
use crate::telemetry::{Metrics, MetricsSnapshot};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Running,
    /// No new work accepted; queued work still drains.
    ShuttingDown,
    /// Shut down and every worker has exited.
    Terminated,
}

pub(crate) struct Queued {
    pub(crate) job: Job,
    pub(crate) enqueued: Instant,
}

pub(crate) struct PoolState {
    pub(crate) queue: PriorityQueue<Queued>,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) live_workers: usize,
    pub(crate) idle_workers: usize,
    peak_workers: usize,
    next_worker_id: WorkerId,
}

/// State shared between the executor handle and its workers.
pub(crate) struct Shared {
    pub(crate) state: Mutex<PoolState>,
    pub(crate) work_ready: Condvar,
    pub(crate) terminated: Condvar,
    pub(crate) accounting: Arc<PriorityAccounting>,
    pub(crate) metrics: Metrics,
    pub(crate) config: Config,
}

impl Shared {
    /// Stop accepting work. Idempotent.
    pub(crate) fn shutdown(&self) {
        let mut state = self.state.lock();
        if state.lifecycle != Lifecycle::Running {
            return;
        }
        tracing::info!(
            queued = state.queue.len(),
            live_workers = state.live_workers,
            "executor shutting down"
        );
        if state.live_workers == 0 {
            state.lifecycle = Lifecycle::Terminated;
            self.terminated.notify_all();
        } else {
            state.lifecycle = Lifecycle::ShuttingDown;
        }
        // wake everyone up to check the lifecycle
        self.work_ready.notify_all();
    }
}

/// Point-in-time view of an executor.
#[derive(Debug, Clone)]
pub struct ExecutorStats {
    pub lifecycle: Lifecycle,
    pub live_workers: usize,
    pub idle_workers: usize,
    pub peak_workers: usize,
    pub queued: usize,
    pub in_flight: usize,
    pub current_extreme: Weight,
    /// What `current_extreme` reads with nothing in flight.
    pub idle_weight: Weight,
    pub metrics: MetricsSnapshot,
}

/// Bounded worker pool that runs tasks lowest-weight first.
///
/// Workers are OS threads, started on demand between `core_threads` and
/// `max_threads`. Tasks of equal weight run in submission order.
pub struct PriorityExecutor {
    shared: Arc<Shared>,
}

impl PriorityExecutor {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let accounting = Arc::new(PriorityAccounting::new(config.idle_weight));
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                queue: PriorityQueue::new(),
                lifecycle: Lifecycle::Running,
                live_workers: 0,
                idle_workers: 0,
                peak_workers: 0,
                next_worker_id: 0,
            }),
            work_ready: Condvar::new(),
            terminated: Condvar::new(),
            accounting,
            metrics: Metrics::new(),
            config,
        });

        Ok(Self { shared })
    }

    /// Executor sized from the number of available CPUs.
    pub fn with_defaults() -> Result<Self> {
        Self::new(Config::default())
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Submit a unit of work under `class`.
    pub fn submit<V, F, E>(&self, work: F, class: impl Into<PriorityClass>) -> Result<ResultHandle<V>>
    where
        V: Send + 'static,
        F: FnOnce() -> std::result::Result<V, E> + Send + 'static,
        E: Into<BoxError>,
    {
        self.submit_task(Task::with_class(work, class))
    }

    /// Submit a unit of work under the configured default class.
    pub fn submit_default<V, F, E>(&self, work: F) -> Result<ResultHandle<V>>
    where
        V: Send + 'static,
        F: FnOnce() -> std::result::Result<V, E> + Send + 'static,
        E: Into<BoxError>,
    {
        self.submit(work, self.shared.config.default_class)
    }

    /// Submit work that may be absent; `None` fails with
    /// [`Error::NullArgument`]. A missing class means the default class.
    pub fn submit_boxed<V: Send + 'static>(
        &self,
        work: Option<BoxedWork<V>>,
        class: Option<PriorityClass>,
    ) -> Result<ResultHandle<V>> {
        let class = class.unwrap_or(self.shared.config.default_class);
        self.submit_task(Task::from_boxed(work, class)?)
    }

    /// Enqueue a pre-built task.
    ///
    /// A task whose handle was already settled (cancelled before
    /// submission, say) is accepted but never queued.
    pub fn submit_task<V: Send + 'static>(&self, task: Task<V>) -> Result<ResultHandle<V>> {
        let handle = task.handle();
        let id = task.id();
        let class = task.class();
        let weight = class.weight();

        let mut state = self.shared.state.lock();
        if state.lifecycle != Lifecycle::Running {
            return Err(Error::RejectedExecution);
        }
        self.ensure_worker(&mut state)?;

        let extreme = self.shared.accounting.record(weight);
        let accounting = Arc::clone(&self.shared.accounting);
        // fires when the handle settles, whoever settles it
        let attached = handle.attach_release(Box::new(move || {
            accounting.release(weight);
        }));
        if !attached {
            let extreme = self.shared.accounting.release(weight);
            tracing::debug!(task = %id, current_extreme = extreme, "task already settled, not queued");
            return Ok(handle);
        }

        state.queue.push(
            Queued {
                job: task.into_job(),
                enqueued: Instant::now(),
            },
            weight,
        );
        if state.idle_workers > 0 {
            self.shared.work_ready.notify_one();
        }
        drop(state);

        self.shared.metrics.record_submitted();
        tracing::debug!(task = %id, class = %class, current_extreme = extreme, "submitted task");
        Ok(handle)
    }

    // Start a worker if below core size, or if nobody is idle and there is
    // room to grow. Only fails when no worker at all is available.
    fn ensure_worker(&self, state: &mut PoolState) -> Result<()> {
        let config = &self.shared.config;
        let below_core = state.live_workers < config.core_threads;
        let saturated = state.idle_workers == 0 && state.live_workers < config.max_threads;
        if !below_core && !saturated {
            return Ok(());
        }

        match self.spawn_worker(state) {
            Ok(()) => Ok(()),
            Err(err) if state.live_workers > 0 => {
                tracing::error!(error = %err, "could not grow executor, continuing with existing workers");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "could not start any worker");
                Err(err)
            }
        }
    }

    fn spawn_worker(&self, state: &mut PoolState) -> Result<()> {
        let config = &self.shared.config;
        let id = state.next_worker_id;
        let name = format!("{}-{}", config.thread_name_prefix, id);

        let mut builder = thread::Builder::new().name(name);
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let shared = Arc::clone(&self.shared);
        builder
            .spawn(move || worker::run(shared, id))
            .map_err(|e| Error::spawn(format!("spawn failed: {}", e)))?;

        state.next_worker_id += 1;
        state.live_workers += 1;
        state.peak_workers = state.peak_workers.max(state.live_workers);
        tracing::trace!(worker = id, live_workers = state.live_workers, "spawned worker");
        Ok(())
    }

    /// Lowest weight among tasks queued or running, or the idle weight.
    pub fn current_extreme_priority(&self) -> Weight {
        self.shared.accounting.current_extreme()
    }

    /// Stop accepting new work. Queued and running tasks still finish and
    /// workers exit once the queue is empty. Idempotent; does not block.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    /// Wait until the executor is shut down and every worker has exited.
    /// Returns `false` on timeout, or immediately when called from a worker.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        if worker::is_worker_thread() {
            return false;
        }
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.shared.state.lock();
        while state.lifecycle != Lifecycle::Terminated {
            match deadline {
                Some(deadline) => {
                    if self
                        .shared
                        .terminated
                        .wait_until(&mut state, deadline)
                        .timed_out()
                    {
                        return state.lifecycle == Lifecycle::Terminated;
                    }
                }
                None => self.shared.terminated.wait(&mut state),
            }
        }
        true
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.state.lock().lifecycle != Lifecycle::Running
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.state.lock().lifecycle == Lifecycle::Terminated
    }

    pub fn queued(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn stats(&self) -> ExecutorStats {
        let state = self.shared.state.lock();
        ExecutorStats {
            lifecycle: state.lifecycle,
            live_workers: state.live_workers,
            idle_workers: state.idle_workers,
            peak_workers: state.peak_workers,
            queued: state.queue.len(),
            in_flight: self.shared.accounting.total_in_flight(),
            current_extreme: self.shared.accounting.current_extreme(),
            idle_weight: self.shared.accounting.idle_weight(),
            metrics: self.shared.metrics.snapshot(),
        }
    }
}

impl Drop for PriorityExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for PriorityExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("PriorityExecutor")
            .field("lifecycle", &state.lifecycle)
            .field("live_workers", &state.live_workers)
            .field("queued", &state.queue.len())
            .field("current_extreme", &self.shared.accounting.current_extreme())
            .finish()
    }
}
