use bytes::{Buf, BufMut, Bytes, BytesMut};
use pivotspace_error::{ErrorCodes, PivotspaceError};
use pivotspace_types::{BucketEntry, DistanceValue, Fingerprint};
use std::cmp::Ordering;
use std::marker::PhantomData;
use thiserror::Error;

/// `u32 pivot_count` followed by `u32 entry_count`, little-endian.
pub const HEADER_WIDTH: usize = 8;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("fingerprint has {actual} dimensions but the bucket declares {expected} pivots")]
    PivotCountMismatch { expected: usize, actual: usize },
    #[error("packed bucket is {actual} bytes, layout requires {expected}")]
    TruncatedBuffer { expected: usize, actual: usize },
}

impl PivotspaceError for CodecError {
    fn code(&self) -> ErrorCodes {
        match self {
            CodecError::PivotCountMismatch { .. } => ErrorCodes::FailedPrecondition,
            CodecError::TruncatedBuffer { .. } => ErrorCodes::DataLoss,
        }
    }
}

/// Zero-copy view over a bucket's serialized form: the header followed by
/// `entry_count` fixed-width records of `pivot_count` distances and an
/// 8-byte record id, sorted ascending by the lexicographic fingerprint
/// order. All record access is offset arithmetic over the shared buffer, so
/// a search never deserializes entries it prunes.
#[derive(Clone, Debug)]
pub struct PackedBucket<T> {
    data: Bytes,
    pivot_count: usize,
    entry_count: usize,
    _marker: PhantomData<T>,
}

impl<T: DistanceValue> PackedBucket<T> {
    pub fn record_width(pivot_count: usize) -> usize {
        pivot_count * T::WIDTH + 8
    }

    pub fn from_bytes(data: Bytes) -> Result<Self, CodecError> {
        if data.len() < HEADER_WIDTH {
            return Err(CodecError::TruncatedBuffer {
                expected: HEADER_WIDTH,
                actual: data.len(),
            });
        }
        let mut header = &data[..HEADER_WIDTH];
        let pivot_count = header.get_u32_le() as usize;
        let entry_count = header.get_u32_le() as usize;
        // Corrupt headers can claim counts whose product overflows; that is
        // data loss, not a panic.
        let expected = Self::record_width(pivot_count)
            .checked_mul(entry_count)
            .and_then(|records| records.checked_add(HEADER_WIDTH))
            .ok_or(CodecError::TruncatedBuffer {
                expected: usize::MAX,
                actual: data.len(),
            })?;
        if data.len() != expected {
            return Err(CodecError::TruncatedBuffer {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            pivot_count,
            entry_count,
            _marker: PhantomData,
        })
    }

    /// Serialize a sorted entry slice. Every entry must match the declared
    /// pivot count; a mismatch means the container is corrupted or misused
    /// and is never recoverable.
    pub fn encode(pivot_count: usize, entries: &[BucketEntry<T>]) -> Result<Bytes, CodecError> {
        let mut buf =
            BytesMut::with_capacity(HEADER_WIDTH + entries.len() * Self::record_width(pivot_count));
        buf.put_u32_le(pivot_count as u32);
        buf.put_u32_le(entries.len() as u32);
        for entry in entries {
            if entry.fingerprint.len() != pivot_count {
                return Err(CodecError::PivotCountMismatch {
                    expected: pivot_count,
                    actual: entry.fingerprint.len(),
                });
            }
            for dim in entry.fingerprint.dims() {
                dim.put(&mut buf);
            }
            buf.put_i64_le(entry.record_id);
        }
        Ok(buf.freeze())
    }

    pub fn pivot_count(&self) -> usize {
        self.pivot_count
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    fn record_offset(&self, index: usize) -> usize {
        HEADER_WIDTH + index * Self::record_width(self.pivot_count)
    }

    /// The leading fingerprint dimension of record `index`, the primary key
    /// of the sort order.
    pub fn leading(&self, index: usize) -> T {
        let offset = self.record_offset(index);
        let mut buf = &self.data[offset..offset + T::WIDTH];
        T::get(&mut buf)
    }

    pub fn fingerprint(&self, index: usize) -> Fingerprint<T> {
        let offset = self.record_offset(index);
        let mut buf = &self.data[offset..offset + self.pivot_count * T::WIDTH];
        let dims = (0..self.pivot_count).map(|_| T::get(&mut buf)).collect();
        Fingerprint::new(dims)
    }

    pub fn record_id(&self, index: usize) -> i64 {
        let offset = self.record_offset(index) + self.pivot_count * T::WIDTH;
        let mut buf = &self.data[offset..offset + 8];
        buf.get_i64_le()
    }

    pub fn entry(&self, index: usize) -> BucketEntry<T> {
        BucketEntry::new(self.fingerprint(index), self.record_id(index))
    }

    pub fn entries(&self) -> Vec<BucketEntry<T>> {
        (0..self.entry_count).map(|i| self.entry(i)).collect()
    }

    /// L-infinity between record `index` and `other`, streamed off the
    /// buffer without materializing the record's fingerprint.
    pub fn l_infinity(&self, index: usize, other: &Fingerprint<T>) -> T {
        let offset = self.record_offset(index);
        let mut buf = &self.data[offset..offset + self.pivot_count * T::WIDTH];
        let mut max = T::ZERO;
        for dim in other.dims() {
            let d = T::get(&mut buf).abs_diff(*dim);
            if d.total_cmp(&max) == Ordering::Greater {
                max = d;
            }
        }
        max
    }

    /// Whether record `index`'s full fingerprint equals `other`.
    pub fn fingerprint_matches(&self, index: usize, other: &Fingerprint<T>) -> bool {
        let offset = self.record_offset(index);
        let mut buf = &self.data[offset..offset + self.pivot_count * T::WIDTH];
        other.dims().len() == self.pivot_count
            && other
                .dims()
                .iter()
                .all(|dim| T::get(&mut buf).total_cmp(dim) == Ordering::Equal)
    }

    /// Index of the *first* record whose leading dimension is `>= low`, or
    /// `entry_count` if none is. Records with a leading dimension exactly at
    /// the window edge must be found at their first position or a scan
    /// starting here would silently skip them.
    // Binary search in the branchless style of the std slice search:
    // conditional moves instead of branching on the comparison.
    pub fn first_leading_at_or_above(&self, low: T) -> usize {
        let mut size = self.entry_count;
        let mut left = 0;
        let mut right = size;
        while left < right {
            let mid = left + size / 2;
            let below = self.leading(mid).total_cmp(&low) == Ordering::Less;
            left = if below { mid + 1 } else { left };
            right = if below { right } else { mid };
            size = right - left;
        }
        left
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(dims: &[i32], id: i64) -> BucketEntry<i32> {
        BucketEntry::new(Fingerprint::new(dims.to_vec()), id)
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let entries = vec![
            entry(&[1, 1], 2),
            entry(&[1, 5], 0),
            entry(&[3, 2], 1),
        ];
        let bytes = PackedBucket::encode(2, &entries).unwrap();
        let packed = PackedBucket::<i32>::from_bytes(bytes).unwrap();
        assert_eq!(packed.pivot_count(), 2);
        assert_eq!(packed.entry_count(), 3);
        assert_eq!(packed.entries(), entries);
    }

    #[test]
    fn test_encode_rejects_pivot_count_mismatch() {
        let err = PackedBucket::encode(3, &[entry(&[1, 1], 0)]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::PivotCountMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_truncated_buffer_is_data_loss() {
        let bytes = PackedBucket::encode(2, &[entry(&[1, 1], 0)]).unwrap();
        let truncated = bytes.slice(..bytes.len() - 3);
        assert!(PackedBucket::<i32>::from_bytes(truncated).is_err());
        assert!(PackedBucket::<i32>::from_bytes(Bytes::from_static(b"abc")).is_err());
    }

    #[test]
    fn test_corrupt_header_with_overflowing_counts_is_data_loss() {
        // Counts whose implied length overflows usize must decode to an
        // error, not panic in the length arithmetic.
        let mut buf = BytesMut::new();
        buf.put_u32_le(u32::MAX);
        buf.put_u32_le(u32::MAX);
        buf.put_i64_le(0);
        let err = PackedBucket::<i32>::from_bytes(buf.freeze()).unwrap_err();
        assert!(matches!(err, CodecError::TruncatedBuffer { .. }));
    }

    #[test]
    fn test_first_position_semantics_on_duplicates() {
        let entries = vec![
            entry(&[1, 0], 0),
            entry(&[2, 0], 1),
            entry(&[2, 1], 2),
            entry(&[2, 2], 3),
            entry(&[5, 0], 4),
        ];
        let bytes = PackedBucket::encode(2, &entries).unwrap();
        let packed = PackedBucket::<i32>::from_bytes(bytes).unwrap();
        assert_eq!(packed.first_leading_at_or_above(0), 0);
        // First of the run of leading == 2, not an arbitrary match.
        assert_eq!(packed.first_leading_at_or_above(2), 1);
        assert_eq!(packed.first_leading_at_or_above(3), 4);
        assert_eq!(packed.first_leading_at_or_above(6), 5);
    }

    proptest! {
        #[test]
        fn test_round_trip_random_entries(
            raw in proptest::collection::vec((proptest::collection::vec(-1000i32..1000, 3), 0i64..1000), 0..64)
        ) {
            let mut entries: Vec<_> = raw
                .into_iter()
                .map(|(dims, id)| BucketEntry::new(Fingerprint::new(dims), id))
                .collect();
            entries.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
            let bytes = PackedBucket::encode(3, &entries).unwrap();
            let packed = PackedBucket::<i32>::from_bytes(bytes).unwrap();
            prop_assert_eq!(packed.entries(), entries);
        }
    }
}
