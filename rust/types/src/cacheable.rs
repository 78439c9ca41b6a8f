use bytes::Bytes;

/// Weight of a value in a size-bounded cache.
pub trait Cacheable {
    fn weight(&self) -> usize {
        1
    }
}

impl Cacheable for Bytes {
    fn weight(&self) -> usize {
        self.len().max(1)
    }
}
