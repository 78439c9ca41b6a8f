use pivotspace_types::{DistanceValue, ResultCollector};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Accepts every match within the query radius; the acceptable distance
/// never shrinks, so pruning uses the radius alone.
pub struct RangeCollector<T> {
    radius: T,
    results: Vec<(i64, T)>,
}

impl<T: DistanceValue> RangeCollector<T> {
    pub fn new(radius: T) -> Self {
        Self {
            radius,
            results: Vec::new(),
        }
    }

    pub fn results(&self) -> &[(i64, T)] {
        &self.results
    }

    pub fn into_results(self) -> Vec<(i64, T)> {
        self.results
    }
}

impl<T: DistanceValue> ResultCollector<T> for RangeCollector<T> {
    fn offer(&mut self, record_id: i64, distance: T) {
        self.results.push((record_id, distance));
    }

    fn acceptable(&self) -> T {
        self.radius
    }
}

// Max-heap item; the root is the worst distance currently held.
struct HeapItem<T> {
    distance: T,
    record_id: i64,
}

impl<T: DistanceValue> PartialEq for HeapItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: DistanceValue> Eq for HeapItem<T> {}

impl<T: DistanceValue> PartialOrd for HeapItem<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: DistanceValue> Ord for HeapItem<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.record_id.cmp(&other.record_id))
    }
}

/// Keeps the k nearest matches seen so far. Once full, the acceptable
/// distance drops to the current worst held distance and only shrinks from
/// there, which tightens pruning for the remainder of the scan.
pub struct KnnCollector<T> {
    k: usize,
    heap: BinaryHeap<HeapItem<T>>,
}

impl<T: DistanceValue> KnnCollector<T> {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Results ascending by distance, ties broken by record id.
    pub fn into_sorted_results(self) -> Vec<(i64, T)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|item| (item.record_id, item.distance))
            .collect()
    }
}

impl<T: DistanceValue> ResultCollector<T> for KnnCollector<T> {
    fn offer(&mut self, record_id: i64, distance: T) {
        if self.k == 0 {
            return;
        }
        self.heap.push(HeapItem {
            distance,
            record_id,
        });
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    fn acceptable(&self) -> T {
        match self.heap.peek() {
            Some(worst) if self.heap.len() >= self.k => worst.distance,
            _ => T::MAX,
        }
    }
}
