use bytes::Bytes;
use parking_lot::RwLock;
use pivotspace_error::{ErrorCodes, PivotspaceError};
use pivotspace_types::BucketAddress;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage backend failure: {message}")]
    Backend { message: String },
}

impl PivotspaceError for StorageError {
    fn code(&self) -> ErrorCodes {
        match self {
            StorageError::Backend { .. } => ErrorCodes::Internal,
        }
    }
}

/// The persistence seam. The core never writes to physical media; it hands
/// each bucket's serialized buffer to this store keyed by address and reads
/// it back on the next operation. A failure here is fatal for the in-flight
/// operation; retry policy belongs to the backend, not the core.
pub trait ByteStore: Send + Sync {
    fn get(&self, address: &BucketAddress) -> Result<Option<Bytes>, StorageError>;
    fn put(&self, address: &BucketAddress, bytes: Bytes) -> Result<(), StorageError>;
}

/// Heap-backed reference store. Puts replace the buffer for an address
/// atomically under the write lock, so readers see complete snapshots only.
#[derive(Clone, Default)]
pub struct MemoryByteStore {
    buckets: Arc<RwLock<HashMap<BucketAddress, Bytes>>>,
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buckets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.read().is_empty()
    }
}

impl ByteStore for MemoryByteStore {
    fn get(&self, address: &BucketAddress) -> Result<Option<Bytes>, StorageError> {
        Ok(self.buckets.read().get(address).cloned())
    }

    fn put(&self, address: &BucketAddress, bytes: Bytes) -> Result<(), StorageError> {
        self.buckets.write().insert(address.clone(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryByteStore::new();
        let address = BucketAddress::from_u64(3);
        assert_eq!(store.get(&address).unwrap(), None);
        store.put(&address, Bytes::from_static(b"packed")).unwrap();
        assert_eq!(
            store.get(&address).unwrap(),
            Some(Bytes::from_static(b"packed"))
        );
        // A second put replaces the snapshot wholesale.
        store.put(&address, Bytes::from_static(b"v2")).unwrap();
        assert_eq!(store.get(&address).unwrap(), Some(Bytes::from_static(b"v2")));
        assert_eq!(store.len(), 1);
    }
}
