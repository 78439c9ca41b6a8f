use pivotspace_types::{BucketAddress, DistanceValue, Fingerprint, FingerprintWindow};

/// Deterministic mapping from fingerprint space to bucket addresses. Many
/// fingerprints share an address; the container resolves those collisions.
/// A query must be routed to every address its window can touch, or matches
/// are silently lost.
pub trait AddressFunction<T: DistanceValue>: Send + Sync {
    fn address(&self, fingerprint: &Fingerprint<T>) -> BucketAddress;

    /// Every address the inclusive window `[low, high]` can map into, in
    /// scan order.
    fn addresses_in_window(&self, window: &FingerprintWindow<T>) -> Vec<BucketAddress>;
}

/// Routes every fingerprint to one shared bucket: the single-bucket index.
#[derive(Clone, Debug, Default)]
pub struct SingleBucket;

impl<T: DistanceValue> AddressFunction<T> for SingleBucket {
    fn address(&self, _fingerprint: &Fingerprint<T>) -> BucketAddress {
        BucketAddress::from_u64(0)
    }

    fn addresses_in_window(&self, _window: &FingerprintWindow<T>) -> Vec<BucketAddress> {
        vec![BucketAddress::from_u64(0)]
    }
}

/// Range-partitions fingerprint space into fixed-width cells of the leading
/// dimension. A query window covers the contiguous run of cells between its
/// two edges, so multi-bucket searches stay bounded by the window width.
#[derive(Clone, Debug)]
pub struct LeadingDimensionPartitioner {
    cell_width: f64,
}

impl LeadingDimensionPartitioner {
    pub fn new(cell_width: f64) -> Self {
        assert!(cell_width > 0.0, "cell width must be positive");
        Self { cell_width }
    }

    fn cell<T: DistanceValue>(&self, value: T) -> i64 {
        (value.to_f64() / self.cell_width).floor() as i64
    }
}

impl<T: DistanceValue> AddressFunction<T> for LeadingDimensionPartitioner {
    fn address(&self, fingerprint: &Fingerprint<T>) -> BucketAddress {
        BucketAddress::from_u64(self.cell(fingerprint.leading()) as u64)
    }

    fn addresses_in_window(&self, window: &FingerprintWindow<T>) -> Vec<BucketAddress> {
        let low = self.cell(window.low.leading());
        let high = self.cell(window.high.leading());
        (low..=high)
            .map(|cell| BucketAddress::from_u64(cell as u64))
            .collect()
    }
}
