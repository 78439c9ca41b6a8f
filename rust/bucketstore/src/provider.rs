use crate::container::{BucketContainer, ContainerError};
use crate::store::{ByteStore, StorageError};
use bytes::Bytes;
use parking_lot::MutexGuard;
use pivotspace_cache::Cache;
use pivotspace_error::{ErrorCodes, PivotspaceError};
use pivotspace_types::{BucketAddress, DistanceValue, PartitionedMutex};
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PivotspaceError for ProviderError {
    fn code(&self) -> ErrorCodes {
        match self {
            ProviderError::Container(e) => e.code(),
            ProviderError::Storage(e) => e.code(),
        }
    }
}

/// Cache-fronted access to bucket containers. Containers are decoded fresh
/// from bytes on every fetch and handed back as bytes on every persist; the
/// cache may evict and the store may be the only copy between any two calls,
/// so no caller retains a container across logical operations.
///
/// Mutating callers take `lock(address)` for the full read-modify-write.
/// Searches skip the lock and read whichever complete snapshot is current.
pub struct BucketProvider<T: DistanceValue> {
    store: Arc<dyn ByteStore>,
    cache: Cache<BucketAddress, Bytes>,
    mutexes: PartitionedMutex<BucketAddress>,
    _marker: PhantomData<T>,
}

impl<T: DistanceValue> BucketProvider<T> {
    pub fn new(store: Arc<dyn ByteStore>, cache: Cache<BucketAddress, Bytes>) -> Self {
        Self {
            store,
            cache,
            mutexes: PartitionedMutex::new(),
            _marker: PhantomData,
        }
    }

    /// The per-address mutation lock. Held for the duration of one
    /// insert/delete; released on drop whether the operation succeeds or
    /// fails, leaving the persisted bytes untouched on failure.
    pub fn lock(&self, address: &BucketAddress) -> MutexGuard<'_, ()> {
        self.mutexes.lock(address)
    }

    pub fn fetch(
        &self,
        address: &BucketAddress,
    ) -> Result<Option<BucketContainer<T>>, ProviderError> {
        if let Some(bytes) = self.cache.get(address) {
            return Ok(Some(BucketContainer::from_bytes(bytes)?));
        }
        match self.store.get(address)? {
            Some(bytes) => {
                self.cache.insert(address.clone(), bytes.clone());
                Ok(Some(BucketContainer::from_bytes(bytes)?))
            }
            None => Ok(None),
        }
    }

    /// Fetch the container at `address`, creating an empty one declared at
    /// `pivot_count` the first time an object maps there.
    pub fn fetch_or_create(
        &self,
        address: &BucketAddress,
        pivot_count: usize,
    ) -> Result<BucketContainer<T>, ProviderError> {
        match self.fetch(address)? {
            Some(mut container) => {
                container.freeze_pivot_count(pivot_count)?;
                Ok(container)
            }
            None => {
                debug!(?address, pivot_count, "creating bucket container");
                Ok(BucketContainer::new(pivot_count))
            }
        }
    }

    /// Serialize and hand the container back to the store, replacing the
    /// previous snapshot wholesale, then refresh the cache.
    pub fn persist(
        &self,
        address: &BucketAddress,
        container: &mut BucketContainer<T>,
    ) -> Result<(), ProviderError> {
        let bytes = container.to_bytes()?;
        self.store.put(address, bytes.clone())?;
        self.cache.insert(address.clone(), bytes);
        Ok(())
    }
}

impl<T: DistanceValue> Clone for BucketProvider<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            mutexes: self.mutexes.clone(),
            _marker: PhantomData,
        }
    }
}
