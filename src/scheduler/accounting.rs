//! In-flight bookkeeping per weight.

use super::priority::Weight;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};

#[derive(Debug, Default)]
struct Buckets {
    counts: HashMap<Weight, usize>,
}

impl Buckets {
    // Classes form a small closed set, so a full scan is cheap.
    fn best(&self) -> Option<Weight> {
        self.counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(&weight, _)| weight)
            .min()
    }
}

/// Tracks how many tasks of each weight are in flight and the lowest such
/// weight ("current extreme").
///
/// Mutation and recomputation happen under one lock; the result is published
/// to an atomic so readers never wait.
#[derive(Debug)]
pub struct PriorityAccounting {
    buckets: Mutex<Buckets>,
    current: AtomicI32,
    idle_weight: Weight,
}

impl PriorityAccounting {
    pub fn new(idle_weight: Weight) -> Self {
        Self {
            buckets: Mutex::new(Buckets::default()),
            current: AtomicI32::new(idle_weight),
            idle_weight,
        }
    }

    /// Record one more in-flight task of `weight`. Returns the new extreme.
    pub fn record(&self, weight: Weight) -> Weight {
        let mut buckets = self.buckets.lock();
        *buckets.counts.entry(weight).or_insert(0) += 1;
        self.publish(&buckets)
    }

    /// Record that a task of `weight` left flight. Returns the new extreme.
    pub fn release(&self, weight: Weight) -> Weight {
        let mut buckets = self.buckets.lock();
        match buckets.counts.get_mut(&weight) {
            Some(count) if *count > 0 => *count -= 1,
            _ => tracing::warn!(weight, "release without matching record"),
        }
        self.publish(&buckets)
    }

    fn publish(&self, buckets: &Buckets) -> Weight {
        let extreme = buckets.best().unwrap_or(self.idle_weight);
        self.current.store(extreme, Ordering::Release);
        extreme
    }

    pub fn current_extreme(&self) -> Weight {
        self.current.load(Ordering::Acquire)
    }

    pub fn idle_weight(&self) -> Weight {
        self.idle_weight
    }

    pub fn in_flight(&self, weight: Weight) -> usize {
        self.buckets.lock().counts.get(&weight).copied().unwrap_or(0)
    }

    pub fn total_in_flight(&self) -> usize {
        self.buckets.lock().counts.values().sum()
    }
}
