//! Worker thread loop and the post-execution hook.

use super::panic_handler::{self, PanicStrategy};
use super::pool::{Lifecycle, Queued, Shared};
use super::task::{RunOutcome, TaskId};
use crate::scheduler::PriorityClass;
use std::cell::Cell;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type WorkerId = usize;

thread_local! {
    static IN_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// True on threads owned by an executor.
pub fn is_worker_thread() -> bool {
    IN_WORKER.with(Cell::get)
}

// main loop
pub(crate) fn run(shared: Arc<Shared>, id: WorkerId) {
    IN_WORKER.with(|flag| flag.set(true));
    tracing::trace!(worker = id, "worker started");

    let mut executed: u64 = 0;
    while let Some(queued) = next_job(&shared, id) {
        execute(&shared, queued);
        executed += 1;
    }

    tracing::trace!(worker = id, executed, "worker exiting");
}

/// Block until there is work, or return `None` when this worker should exit.
/// Exiting workers are removed from the live count before returning.
fn next_job(shared: &Shared, id: WorkerId) -> Option<Queued> {
    let core = shared.config.core_threads;
    let idle_timeout = shared.config.idle_timeout;
    let mut state = shared.state.lock();

    loop {
        if let Some(queued) = state.queue.pop() {
            return Some(queued);
        }
        if state.lifecycle != Lifecycle::Running {
            break;
        }

        let elastic = state.live_workers > core;
        state.idle_workers += 1;
        let timed_out = if elastic {
            shared
                .work_ready
                .wait_for(&mut state, idle_timeout)
                .timed_out()
        } else {
            shared.work_ready.wait(&mut state);
            false
        };
        state.idle_workers -= 1;

        if timed_out && state.queue.is_empty() && state.live_workers > core {
            tracing::trace!(worker = id, "idle worker retiring");
            break;
        }
    }

    state.live_workers -= 1;
    if state.live_workers == 0 && state.lifecycle == Lifecycle::ShuttingDown {
        state.lifecycle = Lifecycle::Terminated;
        shared.terminated.notify_all();
        tracing::info!("executor terminated");
    }
    None
}

fn execute(shared: &Shared, queued: Queued) {
    let Queued { job, enqueued } = queued;
    let id = job.id;
    let class = job.class;
    shared.metrics.record_queue_wait(enqueued.elapsed());

    let start = Instant::now();
    let outcome = panic_handler::catch(|| job.run())
        .unwrap_or_else(|info| RunOutcome::Panicked(info.message));
    after_execute(shared, id, class, &outcome, start.elapsed());
}

/// Post-execution hook, run after every dequeued task. The task's handle is
/// already settled here, and settling released its in-flight count.
fn after_execute(
    shared: &Shared,
    id: TaskId,
    class: PriorityClass,
    outcome: &RunOutcome,
    ran: Duration,
) {
    match outcome {
        RunOutcome::Skipped => {
            shared.metrics.record_skipped();
            tracing::debug!(task = %id, class = %class, "skipped task, handle already settled");
            return;
        }
        RunOutcome::Completed => shared.metrics.record_completed(ran),
        RunOutcome::Failed(_) => shared.metrics.record_failed(ran),
        RunOutcome::Panicked(message) => {
            shared.metrics.record_panicked(ran);
            if shared.config.panic_strategy == PanicStrategy::LogAndContinue {
                tracing::warn!(task = %id, class = %class, panic = %message, "unit of work panicked");
            }
        }
    }

    // accounting was released when the handle settled
    let extreme = shared.accounting.current_extreme();
    tracing::debug!(
        task = %id,
        class = %class,
        outcome = ?outcome,
        current_extreme = extreme,
        "completed task"
    );

    if outcome.is_failure() && shared.config.auto_terminate {
        tracing::warn!(task = %id, "task failed with auto-terminate set, shutting down");
        shared.shutdown();
    }
}
