use parking_lot::{Mutex, MutexGuard};
use std::{
    hash::{DefaultHasher, Hash, Hasher},
    marker::PhantomData,
    sync::Arc,
};

/// A fixed pool of mutexes addressed by key hash. Callers lock the partition
/// a key hashes to for the duration of a read-modify-write; distinct keys
/// contend only on hash collisions, so buckets at different addresses can be
/// mutated concurrently.
pub struct PartitionedMutex<K, H = DefaultHasher>
where
    K: Hash + Eq,
    H: Hasher + Default,
{
    partitions: Arc<[Mutex<()>]>,
    _hasher: PhantomData<H>,
    _key: PhantomData<K>,
}

// TODO: A sensible value for this.
const DEFAULT_NUM_PARTITIONS: usize = 16 * 16;

impl<K, H> PartitionedMutex<K, H>
where
    K: Hash + Eq,
    H: Hasher + Default,
{
    pub fn new() -> Self {
        Self::with_partitions(DEFAULT_NUM_PARTITIONS)
    }

    pub fn with_partitions(num_partitions: usize) -> Self {
        let partitions = (0..num_partitions.max(1))
            .map(|_| Mutex::new(()))
            .collect::<Vec<_>>();
        Self {
            partitions: partitions.into(),
            _hasher: PhantomData,
            _key: PhantomData,
        }
    }

    pub fn lock(&self, key: &K) -> MutexGuard<'_, ()> {
        let mut hasher = H::default();
        key.hash(&mut hasher);
        let hash = hasher.finish() as usize;
        self.partitions[hash % self.partitions.len()].lock()
    }
}

impl<K, H> Default for PartitionedMutex<K, H>
where
    K: Hash + Eq,
    H: Hasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, H> Clone for PartitionedMutex<K, H>
where
    K: Hash + Eq,
    H: Hasher + Default,
{
    fn clone(&self) -> Self {
        Self {
            partitions: self.partitions.clone(),
            _hasher: PhantomData,
            _key: PhantomData,
        }
    }
}
