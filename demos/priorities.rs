//! Priority classes example
//!
//! Run with `RUST_LOG=priority_executor=debug` to watch submissions and
//! completions.

use priority_executor::prelude::*;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Priority Classes Example ===\n");

    let config = Config::builder()
        .fixed_threads(1)
        .build()
        .expect("valid config");
    let executor = PriorityExecutor::new(config).expect("Failed to start executor");

    // keep the single worker busy so everything below queues up
    let warmup = executor
        .submit(
            || {
                thread::sleep(Duration::from_millis(50));
                Ok::<_, BoxError>("warmup")
            },
            TaskType::Computational,
        )
        .expect("submit");

    let mut handles = Vec::new();
    for i in 0..3 {
        let h = executor
            .submit_default(move || {
                let line = format!("[UNSPECIFIED] task {}", i);
                println!("running {}", line);
                Ok::<_, BoxError>(line)
            })
            .expect("submit");
        handles.push(h);
    }
    for i in 0..3 {
        let h = executor
            .submit(
                move || {
                    let line = format!("[OTHER] task {}", i);
                    println!("running {}", line);
                    Ok::<_, BoxError>(line)
                },
                TaskType::Other,
            )
            .expect("submit");
        handles.push(h);
    }
    for i in 0..3 {
        let h = executor
            .submit(
                move || {
                    let line = format!("[IO] task {}", i);
                    println!("running {}", line);
                    Ok::<_, BoxError>(line)
                },
                TaskType::Io,
            )
            .expect("submit");
        handles.push(h);
    }

    println!(
        "Queued {} tasks, current extreme priority = {}",
        handles.len(),
        executor.current_extreme_priority()
    );

    println!("{}", warmup.get().expect("warmup"));
    for h in &handles {
        if let Err(e) = h.get() {
            println!("failed: {}", e);
        }
    }

    executor.shutdown();
    executor.await_termination(Duration::from_secs(5));

    let stats = executor.stats();
    println!(
        "\nCompleted {} tasks, current extreme priority = {}",
        stats.metrics.tasks_completed, stats.current_extreme
    );
    println!("\n=== Example Complete ===");
}
