use bytes::Bytes;

/// Opaque routing key derived from a fingerprint by an address function.
/// Many fingerprints map to one address; collisions are resolved inside the
/// bucket, not avoided here.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BucketAddress(Bytes);

impl BucketAddress {
    pub fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Bytes::copy_from_slice(&value.to_le_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
