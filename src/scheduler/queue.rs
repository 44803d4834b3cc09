//! Pending-work queue ordered by weight, then arrival.

use super::priority::Weight;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;

#[derive(Debug)]
struct Entry<T> {
    weight: Weight,
    seq: u64,
    item: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.weight == other.weight && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // BinaryHeap is a max-heap: the "greatest" entry is the lowest weight,
    // and among equal weights the earliest sequence number.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .weight
            .cmp(&self.weight)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-weight queue with FIFO order among equal weights.
///
/// Not synchronized; the executor keeps it under its pool lock.
#[derive(Debug)]
pub struct PriorityQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    next_seq: u64,
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Enqueue `item`, returning its arrival sequence number.
    pub fn push(&mut self, item: T, weight: Weight) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { weight, seq, item });
        seq
    }

    pub fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|e| e.item)
    }

    /// Weight of the entry `pop` would return.
    pub fn peek_weight(&self) -> Option<Weight> {
        self.heap.peek().map(|e| e.weight)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remove every entry in dequeue order.
    pub fn drain_ordered(&mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(item) = self.pop() {
            out.push(item);
        }
        out
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
