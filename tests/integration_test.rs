use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use priority_executor::prelude::*;
use priority_executor::executor::HandleState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const IDLE: Weight = 11;

fn executor(threads: usize) -> PriorityExecutor {
    let config = Config::builder()
        .fixed_threads(threads)
        .default_class(TaskType::Other)
        .idle_weight(IDLE)
        .build()
        .unwrap();
    PriorityExecutor::new(config).unwrap()
}

/// Park every worker of `exec` on a gate; returns the release sender and the
/// gate handles.
fn pause_workers(exec: &PriorityExecutor, workers: usize) -> (Sender<()>, Vec<ResultHandle<()>>) {
    let (release_tx, release_rx) = bounded::<()>(0);
    let (started_tx, started_rx) = bounded::<()>(workers);
    let gates = (0..workers)
        .map(|_| {
            let release_rx = release_rx.clone();
            let started_tx = started_tx.clone();
            exec.submit(
                move || {
                    started_tx.send(()).ok();
                    release_rx.recv().ok();
                    Ok::<_, BoxError>(())
                },
                PriorityClass::new("gate", Weight::MIN),
            )
            .unwrap()
        })
        .collect();
    for _ in 0..workers {
        started_rx.recv().unwrap();
    }
    (release_tx, gates)
}

fn resume(release: Sender<()>, gates: Vec<ResultHandle<()>>) {
    drop(release);
    for gate in gates {
        gate.get().unwrap();
    }
}

fn recorder() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

fn record_into(
    order: &Arc<Mutex<Vec<String>>>,
    label: &str,
) -> impl FnOnce() -> std::result::Result<(), BoxError> + Send + 'static {
    let order = Arc::clone(order);
    let label = label.to_string();
    move || {
        order.lock().push(label);
        Ok(())
    }
}

#[test]
fn test_distinct_weights_drain_ascending() {
    let exec = executor(1);
    let (release, gates) = pause_workers(&exec, 1);

    let order = recorder();
    let weights = [9, 4, 7, 1, 8, 2, 6];
    let handles: Vec<_> = weights
        .iter()
        .map(|&w| {
            exec.submit(record_into(&order, &w.to_string()), PriorityClass::new("w", w))
                .unwrap()
        })
        .collect();

    resume(release, gates);
    for h in handles {
        h.get().unwrap();
    }

    let drained: Vec<i32> = order.lock().iter().map(|s| s.parse().unwrap()).collect();
    let mut sorted = weights.to_vec();
    sorted.sort();
    assert_eq!(drained, sorted);
}

#[test]
fn test_equal_weights_fifo() {
    let exec = executor(1);
    let (release, gates) = pause_workers(&exec, 1);

    let order = recorder();
    let handles: Vec<_> = (0..20)
        .map(|i| exec.submit(record_into(&order, &i.to_string()), TaskType::Io).unwrap())
        .collect();

    resume(release, gates);
    for h in handles {
        h.get().unwrap();
    }

    let expected: Vec<String> = (0..20).map(|i| i.to_string()).collect();
    assert_eq!(*order.lock(), expected);
}

#[test]
fn test_mixed_weights_scenario() {
    let exec = executor(1);
    let (release, gates) = pause_workers(&exec, 1);

    let order = recorder();
    let mut handles = Vec::new();
    for (label, weight) in [("5-first", 5), ("1", 1), ("5-second", 5), ("3", 3)] {
        handles.push(
            exec.submit(record_into(&order, label), PriorityClass::new(label, weight))
                .unwrap(),
        );
    }

    resume(release, gates);
    for h in handles {
        h.get().unwrap();
    }
    assert_eq!(*order.lock(), vec!["1", "3", "5-first", "5-second"]);
}

#[test]
fn test_current_extreme_single_task() {
    let exec = executor(1);
    assert_eq!(exec.current_extreme_priority(), IDLE);

    let (release_tx, release_rx) = bounded::<()>(0);
    let handle = exec
        .submit(
            move || {
                release_rx.recv().ok();
                Ok::<_, BoxError>(())
            },
            PriorityClass::new("w", 4),
        )
        .unwrap();
    assert_eq!(exec.current_extreme_priority(), 4);

    drop(release_tx);
    handle.get().unwrap();
    assert_eq!(exec.current_extreme_priority(), IDLE);
}

#[test]
fn test_current_extreme_idle_as_soon_as_get_returns() {
    let exec = executor(1);
    let mut stale = 0;
    for i in 0..2000 {
        let handle = exec
            .submit(move || Ok::<_, BoxError>(i), PriorityClass::new("w", 4))
            .unwrap();
        handle.get().unwrap();
        if exec.current_extreme_priority() != IDLE {
            stale += 1;
        }
    }
    assert_eq!(stale, 0);
}

#[test]
fn test_current_extreme_steps_to_next_bucket_after_get() {
    let exec = executor(1);
    let (release, gates) = pause_workers(&exec, 1);

    let (second_tx, second_rx) = bounded::<()>(0);
    let io = exec.submit(|| Ok::<_, BoxError>("io"), TaskType::Io).unwrap();
    let other = exec
        .submit(
            move || {
                second_rx.recv().ok();
                Ok::<_, BoxError>("other")
            },
            TaskType::Other,
        )
        .unwrap();
    assert_eq!(exec.current_extreme_priority(), Weight::MIN);

    resume(release, gates);
    assert_eq!(io.get().unwrap(), "io");
    assert_eq!(exec.current_extreme_priority(), TaskType::Other.weight());

    drop(second_tx);
    assert_eq!(other.get().unwrap(), "other");
    assert_eq!(exec.current_extreme_priority(), IDLE);
}

#[test]
fn test_current_extreme_recovers_after_best_bucket_empties() {
    let exec = executor(1);
    let (release, gates) = pause_workers(&exec, 1);

    let low = exec.submit(|| Ok::<_, BoxError>(()), TaskType::Other).unwrap();
    let high = exec.submit(|| Ok::<_, BoxError>(()), TaskType::Computational).unwrap();
    assert_eq!(exec.current_extreme_priority(), Weight::MIN);

    resume(release, gates);
    high.get().unwrap();
    low.get().unwrap();
    assert_eq!(exec.current_extreme_priority(), IDLE);
}

#[test]
fn test_get_timeout_does_not_cancel() {
    let exec = executor(1);
    let handle = exec
        .submit(
            || {
                thread::sleep(Duration::from_millis(150));
                Ok::<_, BoxError>(42)
            },
            TaskType::Computational,
        )
        .unwrap();

    let err = handle.get_timeout(Duration::from_millis(10)).unwrap_err();
    assert!(matches!(err, Error::TimedOut));
    assert!(!handle.is_done());

    assert_eq!(handle.get_timeout(Duration::from_secs(5)).unwrap(), 42);
}

#[test]
fn test_null_argument_and_invalid_configuration() {
    let err = Task::<i32>::builder().class(TaskType::Io).build().unwrap_err();
    assert!(matches!(err, Error::NullArgument));

    let exec = executor(1);
    let err = exec.submit_boxed::<i32>(None, Some(TaskType::Io.into())).unwrap_err();
    assert!(matches!(err, Error::NullArgument));

    let err = Config::builder().core_threads(0).max_threads(0).build().unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration(_)));

    let config = Config {
        max_threads: 0,
        core_threads: 0,
        ..Config::default()
    };
    assert!(matches!(
        PriorityExecutor::new(config),
        Err(Error::InvalidConfiguration(_))
    ));
}

#[test]
fn test_submit_after_shutdown_rejected_but_queued_work_completes() {
    let exec = executor(1);
    let (release, gates) = pause_workers(&exec, 1);

    let queued = exec
        .submit(|| Ok::<_, BoxError>("still runs"), TaskType::Other)
        .unwrap();
    exec.shutdown();

    let err = exec.submit(|| Ok::<_, BoxError>("nope"), TaskType::Other).unwrap_err();
    assert!(matches!(err, Error::RejectedExecution));
    let task = Task::create(|| Ok::<_, BoxError>("nope"));
    assert!(matches!(exec.submit_task(task), Err(Error::RejectedExecution)));

    resume(release, gates);
    assert_eq!(queued.get().unwrap(), "still runs");
    assert!(exec.await_termination(Duration::from_secs(5)));
}

#[test]
fn test_failure_delivered_and_worker_survives() {
    let exec = executor(1);

    let failing = exec
        .submit(|| Err::<u32, _>("broken pipe"), TaskType::Io)
        .unwrap();
    let panicking = exec
        .submit(
            || -> std::result::Result<u32, BoxError> { panic!("worker must survive this") },
            TaskType::Io,
        )
        .unwrap();
    let fine = exec.submit(|| Ok::<_, BoxError>(7u32), TaskType::Io).unwrap();

    assert!(matches!(failing.get(), Err(Error::Failed(e)) if e.to_string() == "broken pipe"));
    assert!(matches!(panicking.get(), Err(Error::Panicked(_))));
    assert_eq!(fine.get().unwrap(), 7);
    assert!(!exec.is_shutdown());
}

#[test]
fn test_auto_terminate_on_failure() {
    let config = Config::builder()
        .fixed_threads(1)
        .auto_terminate(true)
        .build()
        .unwrap();
    let exec = PriorityExecutor::new(config).unwrap();

    let failing = exec.submit(|| Err::<(), _>("fatal"), TaskType::Computational).unwrap();
    assert!(failing.get().is_err());
    assert!(exec.await_termination(Duration::from_secs(5)));
    assert!(matches!(
        exec.submit(|| Ok::<_, BoxError>(()), TaskType::Io),
        Err(Error::RejectedExecution)
    ));
}

#[test]
fn test_cancel_only_before_start() {
    let exec = executor(1);
    let (started_tx, started_rx) = bounded::<()>(1);
    let (release_tx, release_rx) = bounded::<()>(0);

    let running = exec
        .submit(
            move || {
                started_tx.send(()).ok();
                release_rx.recv().ok();
                Ok::<_, BoxError>("finished")
            },
            TaskType::Computational,
        )
        .unwrap();
    started_rx.recv().unwrap();

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ran);
    let queued = exec
        .submit(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>("never")
            },
            TaskType::Io,
        )
        .unwrap();

    assert!(!running.cancel());
    assert!(queued.cancel());
    assert_eq!(queued.state(), HandleState::Cancelled);

    drop(release_tx);
    assert_eq!(running.get().unwrap(), "finished");
    exec.shutdown();
    assert!(exec.await_termination(Duration::from_secs(5)));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert!(matches!(queued.get(), Err(Error::Cancelled)));
}

#[test]
fn test_get_from_worker_does_not_block() {
    let exec = executor(1);
    let never: ResultHandle<u8> = ResultHandle::new();
    let probe = never.clone();
    let handle = exec
        .submit(move || Ok::<_, BoxError>(probe.get()), TaskType::Io)
        .unwrap();
    assert!(matches!(handle.get().unwrap(), Err(Error::WouldBlockWorker)));
    assert_eq!(never.state(), HandleState::Pending);
}

#[test]
fn test_elastic_workers_retire() {
    let config = Config::builder()
        .core_threads(0)
        .max_threads(4)
        .idle_timeout(Duration::from_millis(20))
        .build()
        .unwrap();
    let exec = PriorityExecutor::new(config).unwrap();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            exec.submit(
                move || {
                    thread::sleep(Duration::from_millis(2));
                    Ok::<_, BoxError>(i)
                },
                TaskType::Computational,
            )
            .unwrap()
        })
        .collect();
    for h in &handles {
        h.get().unwrap();
    }
    assert!(exec.stats().peak_workers <= 4);

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while exec.stats().live_workers > 0 && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(exec.stats().live_workers, 0);

    // a retired pool still accepts work
    let again = exec.submit(|| Ok::<_, BoxError>("again"), TaskType::Io).unwrap();
    assert_eq!(again.get().unwrap(), "again");
}

#[test]
fn test_partial_workflow() {
    let exec = PriorityExecutor::with_defaults().unwrap();

    let task = Task::with_class(
        || Ok::<_, BoxError>((1..=10).sum::<i32>()),
        TaskType::Computational,
    );
    let sum = exec.submit_task(task).unwrap();
    let price = exec
        .submit(|| Ok::<_, BoxError>(1000.0 * 1.02f64.powi(5)), TaskType::Computational)
        .unwrap();
    let reversed = exec
        .submit(
            || Ok::<_, BoxError>("ABCDEFGHIJKLMNOPQRSTUVWXYZ".chars().rev().collect::<String>()),
            TaskType::Io,
        )
        .unwrap();

    assert_eq!(sum.get_timeout(Duration::from_secs(5)).unwrap(), 55);
    assert!((price.get().unwrap() - 1104.08).abs() < 0.01);
    assert_eq!(reversed.get().unwrap(), "ZYXWVUTSRQPONMLKJIHGFEDCBA");
    assert_eq!(exec.current_extreme_priority(), exec.config().idle_weight);

    exec.shutdown();
    assert!(exec.await_termination(Duration::from_secs(5)));
    assert_eq!(exec.current_extreme_priority(), exec.config().idle_weight);
}
