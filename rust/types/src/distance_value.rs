use bytes::{Buf, BufMut};
use std::cmp::Ordering;
use std::fmt::Debug;

/// A totally ordered numeric type usable as the return type of a metric's
/// distance function. One generic implementation of the bucket machinery is
/// instantiated per concrete distance type via monomorphization, instead of
/// duplicating the container per numeric width.
///
/// Implementations must encode with a fixed width so packed bucket records
/// can be addressed by arithmetic alone.
pub trait DistanceValue: Copy + Debug + Send + Sync + 'static {
    /// Encoded width in bytes in the packed bucket layout.
    const WIDTH: usize;
    const ZERO: Self;
    /// Sentinel ordered above every distance the metric can produce.
    const MAX: Self;

    fn total_cmp(&self, other: &Self) -> Ordering;

    /// `|self - other|`, defined at the type's boundaries.
    fn abs_diff(self, other: Self) -> Self;

    /// Addition clamped at [`Self::MAX`]; used to derive the upper edge of a
    /// query's fingerprint window.
    fn add_saturating(self, rhs: Self) -> Self;

    /// Subtraction clamped at the type's minimum; used to derive the lower
    /// edge of a query's fingerprint window.
    fn sub_saturating(self, rhs: Self) -> Self;

    fn put(self, buf: &mut impl BufMut);
    fn get(buf: &mut impl Buf) -> Self;

    /// Lossy numeric view, used only for coarse partitioning decisions.
    fn to_f64(self) -> f64;
}

impl DistanceValue for u8 {
    const WIDTH: usize = 1;
    const ZERO: Self = 0;
    const MAX: Self = u8::MAX;

    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn abs_diff(self, other: Self) -> Self {
        u8::abs_diff(self, other)
    }

    fn add_saturating(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }

    fn sub_saturating(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }

    fn put(self, buf: &mut impl BufMut) {
        buf.put_u8(self);
    }

    fn get(buf: &mut impl Buf) -> Self {
        buf.get_u8()
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl DistanceValue for u16 {
    const WIDTH: usize = 2;
    const ZERO: Self = 0;
    const MAX: Self = u16::MAX;

    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn abs_diff(self, other: Self) -> Self {
        u16::abs_diff(self, other)
    }

    fn add_saturating(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }

    fn sub_saturating(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }

    fn put(self, buf: &mut impl BufMut) {
        buf.put_u16_le(self);
    }

    fn get(buf: &mut impl Buf) -> Self {
        buf.get_u16_le()
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl DistanceValue for i32 {
    const WIDTH: usize = 4;
    const ZERO: Self = 0;
    const MAX: Self = i32::MAX;

    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    // i32::abs_diff returns u32, so keep the result in Self.
    fn abs_diff(self, other: Self) -> Self {
        if self >= other {
            self.saturating_sub(other)
        } else {
            other.saturating_sub(self)
        }
    }

    fn add_saturating(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }

    fn sub_saturating(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }

    fn put(self, buf: &mut impl BufMut) {
        buf.put_i32_le(self);
    }

    fn get(buf: &mut impl Buf) -> Self {
        buf.get_i32_le()
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl DistanceValue for i64 {
    const WIDTH: usize = 8;
    const ZERO: Self = 0;
    const MAX: Self = i64::MAX;

    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn abs_diff(self, other: Self) -> Self {
        if self >= other {
            self.saturating_sub(other)
        } else {
            other.saturating_sub(self)
        }
    }

    fn add_saturating(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }

    fn sub_saturating(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }

    fn put(self, buf: &mut impl BufMut) {
        buf.put_i64_le(self);
    }

    fn get(buf: &mut impl Buf) -> Self {
        buf.get_i64_le()
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl DistanceValue for f32 {
    const WIDTH: usize = 4;
    const ZERO: Self = 0.0;
    const MAX: Self = f32::MAX;

    fn total_cmp(&self, other: &Self) -> Ordering {
        f32::total_cmp(self, other)
    }

    fn abs_diff(self, other: Self) -> Self {
        (self - other).abs()
    }

    fn add_saturating(self, rhs: Self) -> Self {
        (self + rhs).min(Self::MAX)
    }

    fn sub_saturating(self, rhs: Self) -> Self {
        (self - rhs).max(f32::MIN)
    }

    fn put(self, buf: &mut impl BufMut) {
        buf.put_f32_le(self);
    }

    fn get(buf: &mut impl Buf) -> Self {
        buf.get_f32_le()
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}
