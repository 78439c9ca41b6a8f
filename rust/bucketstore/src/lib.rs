pub mod codec;
pub mod container;
pub mod provider;
pub mod store;

pub use codec::{CodecError, PackedBucket};
pub use container::{BucketContainer, ContainerError, DeleteResult, ExistsResult, InsertResult};
pub use provider::{BucketProvider, ProviderError};
pub use store::{ByteStore, MemoryByteStore, StorageError};

use pivotspace_types::DistanceValue;
use std::sync::Arc;

pub fn new_provider_for_test<T: DistanceValue>() -> BucketProvider<T> {
    BucketProvider::new(
        Arc::new(MemoryByteStore::new()),
        pivotspace_cache::new_cache_for_test(),
    )
}
