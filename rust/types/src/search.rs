use crate::distance_value::DistanceValue;
use crate::fingerprint::{Fingerprint, FingerprintWindow};
use pivotspace_error::PivotspaceError;
use std::cmp::Ordering;

/// A prepared range query over fingerprint space: the probe's fingerprint,
/// the search radius, and the inclusive window `[low, high]` that bounds
/// candidate scanning along the primary sort dimension.
#[derive(Clone, Debug)]
pub struct RangeQuery<T: DistanceValue> {
    pub fingerprint: Fingerprint<T>,
    pub radius: T,
    pub window: FingerprintWindow<T>,
}

impl<T: DistanceValue> RangeQuery<T> {
    pub fn new(fingerprint: Fingerprint<T>, radius: T) -> Self {
        let window = fingerprint.window(radius);
        Self {
            fingerprint,
            radius,
            window,
        }
    }
}

/// Resolves a record id to the real (possibly expensive) distance between
/// the stored object and the probe object of the in-flight operation.
/// Implementations fetch the object from the external object store; a fetch
/// failure aborts the operation.
pub trait Verifier<T: DistanceValue> {
    fn distance_to(&self, record_id: i64) -> Result<T, Box<dyn PivotspaceError>>;
}

/// Sink for search results. Bounded collectors (top-k) expose a current
/// acceptable distance that shrinks monotonically as better matches arrive,
/// tightening the pruning bound mid-scan.
pub trait ResultCollector<T: DistanceValue> {
    /// Offer a candidate that survived pruning and whose real distance is
    /// within the query radius. The collector may still discard it.
    fn offer(&mut self, record_id: i64, distance: T);

    /// The largest distance the collector would currently accept.
    fn acceptable(&self) -> T;

    /// Whether an entry with this pruning lower bound can still contribute.
    fn is_candidate(&self, lower_bound: T) -> bool {
        lower_bound.total_cmp(&self.acceptable()) != Ordering::Greater
    }
}
