//! Counters and latency histograms for the executor.

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// One hour in nanoseconds, three significant figures.
const HISTOGRAM_MAX_NS: u64 = 3_600_000_000_000;
const HISTOGRAM_SIGFIG: u8 = 3;

fn new_histogram() -> Option<Histogram<u64>> {
    Histogram::new_with_max(HISTOGRAM_MAX_NS, HISTOGRAM_SIGFIG).ok()
}

/// Executor metrics collector
#[derive(Debug)]
pub struct Metrics {
    tasks_submitted: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_panicked: AtomicU64,
    tasks_skipped: AtomicU64,

    // time from submission to a worker picking the task up
    queue_wait: Mutex<Option<Histogram<u64>>>,
    // time spent inside the unit of work
    run_time: Mutex<Option<Histogram<u64>>>,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            tasks_submitted: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            tasks_skipped: AtomicU64::new(0),
            queue_wait: Mutex::new(new_histogram()),
            run_time: Mutex::new(new_histogram()),
            start_time: Instant::now(),
        }
    }

    pub fn record_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_wait(&self, waited: Duration) {
        if let Some(hist) = self.queue_wait.lock().as_mut() {
            hist.saturating_record(waited.as_nanos() as u64);
        }
    }

    pub fn record_completed(&self, ran: Duration) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        self.record_run_time(ran);
    }

    pub fn record_failed(&self, ran: Duration) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        self.record_run_time(ran);
    }

    pub fn record_panicked(&self, ran: Duration) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
        self.record_run_time(ran);
    }

    /// A dequeued task whose handle was already terminal.
    pub fn record_skipped(&self) {
        self.tasks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn record_run_time(&self, ran: Duration) {
        if let Some(hist) = self.run_time.lock().as_mut() {
            hist.saturating_record(ran.as_nanos() as u64);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (avg_wait_ns, p99_wait_ns) = quantiles(&self.queue_wait.lock(), 0.99);
        let run_time = self.run_time.lock();
        let (avg_run_ns, p50_run_ns) = quantiles(&run_time, 0.50);
        let (_, p99_run_ns) = quantiles(&run_time, 0.99);

        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
            tasks_skipped: self.tasks_skipped.load(Ordering::Relaxed),
            avg_queue_wait_ns: avg_wait_ns,
            p99_queue_wait_ns: p99_wait_ns,
            avg_run_ns,
            p50_run_ns,
            p99_run_ns,
        }
    }
}

fn quantiles(hist: &Option<Histogram<u64>>, q: f64) -> (u64, u64) {
    match hist {
        Some(h) if !h.is_empty() => (h.mean() as u64, h.value_at_quantile(q)),
        _ => (0, 0),
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_panicked: u64,
    pub tasks_skipped: u64,
    pub avg_queue_wait_ns: u64,
    pub p99_queue_wait_ns: u64,
    pub avg_run_ns: u64,
    pub p50_run_ns: u64,
    pub p99_run_ns: u64,
}

impl MetricsSnapshot {
    /// Tasks whose unit of work actually ran.
    pub fn tasks_executed(&self) -> u64 {
        self.tasks_completed + self.tasks_failed + self.tasks_panicked
    }

    pub fn failure_rate(&self) -> f64 {
        let executed = self.tasks_executed();
        if executed == 0 {
            0.0
        } else {
            (self.tasks_failed + self.tasks_panicked) as f64 / executed as f64
        }
    }
}
