use crate::distance_value::DistanceValue;
use std::cmp::Ordering;

/// The pivot-mapped representation of a stored object: an ordered,
/// fixed-length tuple holding the object's distance to every pivot. Computed
/// once per object when it enters the index.
///
/// Fingerprints stored in the same bucket always have the same length (the
/// bucket's declared pivot count).
#[derive(Clone, Debug)]
pub struct Fingerprint<T> {
    dims: Vec<T>,
}

impl<T: DistanceValue> Fingerprint<T> {
    pub fn new(dims: Vec<T>) -> Self {
        Self { dims }
    }

    pub fn len(&self) -> usize {
        self.dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn dims(&self) -> &[T] {
        &self.dims
    }

    /// The primary sort key of the lexicographic entry order.
    pub fn leading(&self) -> T {
        self.dims[0]
    }

    /// The maximum per-dimension absolute difference. By the triangle
    /// inequality this never exceeds the real distance between the two
    /// underlying objects, so it is a safe pruning lower bound.
    pub fn l_infinity(&self, other: &Self) -> T {
        debug_assert_eq!(self.dims.len(), other.dims.len());
        let mut max = T::ZERO;
        for (a, b) in self.dims.iter().zip(other.dims.iter()) {
            let d = a.abs_diff(*b);
            if d.total_cmp(&max) == Ordering::Greater {
                max = d;
            }
        }
        max
    }

    /// The inclusive window `[low, high]` a range query with this
    /// fingerprint and the given radius must scan. Saturates at the distance
    /// type's boundaries, which can only widen the window, never narrow it.
    pub fn window(&self, radius: T) -> FingerprintWindow<T> {
        let low = self.dims.iter().map(|d| d.sub_saturating(radius)).collect();
        let high = self.dims.iter().map(|d| d.add_saturating(radius)).collect();
        FingerprintWindow {
            low: Fingerprint::new(low),
            high: Fingerprint::new(high),
        }
    }
}

impl<T: DistanceValue> PartialEq for Fingerprint<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: DistanceValue> Eq for Fingerprint<T> {}

impl<T: DistanceValue> PartialOrd for Fingerprint<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: DistanceValue> Ord for Fingerprint<T> {
    /// Lexicographic over dimensions, left to right. Lengths only differ for
    /// fingerprints from different indexes; shorter sorts first in that case.
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.dims.iter().zip(other.dims.iter()) {
            match a.total_cmp(b) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        self.dims.len().cmp(&other.dims.len())
    }
}

/// The inclusive fingerprint range scanned by one query.
#[derive(Clone, Debug)]
pub struct FingerprintWindow<T> {
    pub low: Fingerprint<T>,
    pub high: Fingerprint<T>,
}

/// One stored record: a fingerprint and the id of the underlying object in
/// the external object store. Entries order by fingerprint alone; two
/// entries with equal fingerprints are distinguished only by re-checking the
/// real distance of their underlying objects, never by id.
#[derive(Clone, Debug)]
pub struct BucketEntry<T> {
    pub fingerprint: Fingerprint<T>,
    pub record_id: i64,
}

impl<T: DistanceValue> BucketEntry<T> {
    pub fn new(fingerprint: Fingerprint<T>, record_id: i64) -> Self {
        Self {
            fingerprint,
            record_id,
        }
    }
}

impl<T: DistanceValue> PartialEq for BucketEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.record_id == other.record_id && self.fingerprint == other.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(dims: &[i32]) -> Fingerprint<i32> {
        Fingerprint::new(dims.to_vec())
    }

    #[test]
    fn test_lexicographic_order() {
        assert!(fp(&[1, 1]) < fp(&[1, 5]));
        assert!(fp(&[1, 5]) < fp(&[3, 2]));
        assert!(fp(&[3, 2]) == fp(&[3, 2]));
        // Ties resolved by later dimensions, left to right.
        assert!(fp(&[2, 2, 1]) < fp(&[2, 2, 9]));
    }

    #[test]
    fn test_l_infinity() {
        assert_eq!(fp(&[1, 5]).l_infinity(&fp(&[1, 1])), 4);
        assert_eq!(fp(&[3, 2]).l_infinity(&fp(&[1, 1])), 2);
        assert_eq!(fp(&[7, 7]).l_infinity(&fp(&[7, 7])), 0);
    }

    #[test]
    fn test_window_saturates() {
        let w = Fingerprint::new(vec![1u8, 200]).window(60);
        assert_eq!(w.low.dims(), &[0, 140]);
        assert_eq!(w.high.dims(), &[61, u8::MAX]);
    }

    #[test]
    fn test_float_order_is_total() {
        let a = Fingerprint::new(vec![1.0f32, 2.0]);
        let b = Fingerprint::new(vec![1.0f32, 2.5]);
        assert!(a < b);
        assert_eq!(a, a.clone());
    }
}
