use crate::config::CacheConfig;
use core::hash::Hash;
use foyer::{
    Cache as FoyerCache, CacheBuilder, LfuConfig as FoyerLfuConfig, LruConfig as FoyerLruConfig,
};
use parking_lot::RwLock;
use pivotspace_error::{ErrorCodes, PivotspaceError};
use pivotspace_types::Cacheable;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Read-through cache sitting in front of the byte store. Buckets are small
/// and hot, so the default deployments bound the cache by entry count (LRU,
/// LFU) or by serialized size (weighted LRU); the unbounded variant backs
/// tests.
#[derive(Clone)]
pub enum Cache<K, V>
where
    K: Send + Sync + Clone + Hash + Eq + 'static,
    V: Send + Sync + Clone + Cacheable + 'static,
{
    Unbounded(UnboundedCache<K, V>),
    Foyer(FoyerCacheWrapper<K, V>),
}

impl<K, V> Cache<K, V>
where
    K: Send + Sync + Clone + Hash + Eq + 'static,
    V: Send + Sync + Clone + Cacheable + 'static,
{
    pub fn try_from_config(config: &CacheConfig) -> Result<Self, CacheConfigError> {
        match config {
            CacheConfig::Unbounded(_) => Ok(Cache::Unbounded(UnboundedCache::new())),
            CacheConfig::Lru(_) | CacheConfig::Lfu(_) | CacheConfig::WeightedLru(_) => {
                Ok(Cache::Foyer(FoyerCacheWrapper::try_new(config)?))
            }
        }
    }

    pub fn insert(&self, key: K, value: V) {
        match self {
            Cache::Unbounded(cache) => cache.insert(key, value),
            Cache::Foyer(cache) => cache.insert(key, value),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        match self {
            Cache::Unbounded(cache) => cache.get(key),
            Cache::Foyer(cache) => cache.get(key),
        }
    }

    pub fn remove(&self, key: &K) {
        match self {
            Cache::Unbounded(cache) => {
                cache.cache.write().remove(key);
            }
            Cache::Foyer(cache) => {
                cache.cache.remove(key);
            }
        }
    }

    pub fn clear(&self) {
        match self {
            Cache::Unbounded(cache) => {
                let mut write_guard = cache.cache.write();
                write_guard.clear();
                write_guard.shrink_to_fit();
            }
            Cache::Foyer(cache) => cache.cache.clear(),
        }
    }
}

#[derive(Clone)]
pub struct UnboundedCache<K, V>
where
    K: Send + Sync + Clone + Hash + Eq + 'static,
    V: Send + Sync + Clone + Cacheable + 'static,
{
    cache: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> UnboundedCache<K, V>
where
    K: Send + Sync + Clone + Hash + Eq + 'static,
    V: Send + Sync + Clone + Cacheable + 'static,
{
    pub fn new() -> Self {
        UnboundedCache {
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.cache.write().insert(key, value);
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.cache.read().get(key).cloned()
    }
}

impl<K, V> Default for UnboundedCache<K, V>
where
    K: Send + Sync + Clone + Hash + Eq + 'static,
    V: Send + Sync + Clone + Cacheable + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct FoyerCacheWrapper<K, V>
where
    K: Send + Sync + Hash + Eq + 'static,
    V: Send + Sync + Clone + Cacheable + 'static,
{
    cache: FoyerCache<K, V>,
}

impl<K, V> FoyerCacheWrapper<K, V>
where
    K: Send + Sync + Hash + Eq + 'static,
    V: Send + Sync + Clone + Cacheable + 'static,
{
    pub fn try_new(config: &CacheConfig) -> Result<Self, CacheConfigError> {
        match config {
            CacheConfig::Lru(lru) => {
                let cache_builder = CacheBuilder::new(lru.capacity)
                    .with_eviction_config(FoyerLruConfig::default());
                Ok(FoyerCacheWrapper {
                    cache: cache_builder.build(),
                })
            }
            CacheConfig::Lfu(lfu) => {
                let cache_builder = CacheBuilder::new(lfu.capacity)
                    .with_eviction_config(FoyerLfuConfig::default());
                Ok(FoyerCacheWrapper {
                    cache: cache_builder.build(),
                })
            }
            CacheConfig::WeightedLru(weighted_lru) => {
                let cache_builder = CacheBuilder::new(weighted_lru.capacity_bytes)
                    .with_eviction_config(FoyerLruConfig::default())
                    .with_weighter(|_key: &_, value: &V| value.weight());
                Ok(FoyerCacheWrapper {
                    cache: cache_builder.build(),
                })
            }
            CacheConfig::Unbounded(_) => Err(CacheConfigError::InvalidCacheConfig),
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.cache.insert(key, value);
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.cache.get(key).map(|entry| entry.value().to_owned())
    }
}

#[derive(Error, Debug)]
pub enum CacheConfigError {
    #[error("Invalid cache config")]
    InvalidCacheConfig,
}

impl PivotspaceError for CacheConfigError {
    fn code(&self) -> ErrorCodes {
        match self {
            CacheConfigError::InvalidCacheConfig => ErrorCodes::InvalidArgument,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LruConfig;
    use bytes::Bytes;

    #[test]
    fn test_unbounded_cache_round_trip() {
        let cache: Cache<u64, Bytes> = Cache::try_from_config(&CacheConfig::default()).unwrap();
        assert_eq!(cache.get(&1), None);
        cache.insert(1, Bytes::from_static(b"bucket"));
        assert_eq!(cache.get(&1), Some(Bytes::from_static(b"bucket")));
        cache.remove(&1);
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_lru_cache_round_trip() {
        let cache: Cache<u64, Bytes> =
            Cache::try_from_config(&CacheConfig::Lru(LruConfig { capacity: 8 })).unwrap();
        cache.insert(3, Bytes::from_static(b"x"));
        assert_eq!(cache.get(&3), Some(Bytes::from_static(b"x")));
        cache.clear();
        assert_eq!(cache.get(&3), None);
    }

    #[test]
    fn test_foyer_wrapper_rejects_unbounded_config() {
        let result = FoyerCacheWrapper::<u64, Bytes>::try_new(&CacheConfig::default());
        assert!(matches!(result, Err(CacheConfigError::InvalidCacheConfig)));
    }
}
