use pivotspace_types::{DistanceValue, Fingerprint};
use std::marker::PhantomData;
use std::sync::Arc;

/// An object of the metric space. Implementors promise the metric
/// properties the pruning bound relies on: symmetry, the triangle
/// inequality, and distance zero exactly between the same logical object.
pub trait MetricObject<T: DistanceValue>: Send + Sync {
    /// The real, possibly expensive, pairwise distance.
    fn distance(&self, other: &Self) -> T;
}

/// The ordered, immutable pivot list. Frozen before the index starts
/// operating and shared read-only by arbitrarily many concurrent
/// operations; the bucket core borrows it, never owns it.
pub struct PivotSet<O, T> {
    pivots: Arc<Vec<O>>,
    _marker: PhantomData<T>,
}

impl<O: MetricObject<T>, T: DistanceValue> PivotSet<O, T> {
    pub fn new(pivots: Vec<O>) -> Self {
        Self {
            pivots: Arc::new(pivots),
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.pivots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pivots.is_empty()
    }

    /// Map an object into fingerprint space: one distance call per pivot,
    /// in pivot order.
    pub fn fingerprint(&self, object: &O) -> Fingerprint<T> {
        Fingerprint::new(self.pivots.iter().map(|p| object.distance(p)).collect())
    }
}

impl<O, T> Clone for PivotSet<O, T> {
    fn clone(&self) -> Self {
        Self {
            pivots: self.pivots.clone(),
            _marker: PhantomData,
        }
    }
}
