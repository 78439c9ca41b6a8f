pub mod cache;
pub mod config;

pub use crate::cache::{Cache, CacheConfigError, FoyerCacheWrapper, UnboundedCache};
pub use crate::config::CacheConfig;

use pivotspace_types::Cacheable;
use std::hash::Hash;

pub fn from_config<K, V>(config: &CacheConfig) -> Result<Cache<K, V>, CacheConfigError>
where
    K: Send + Sync + Clone + Hash + Eq + 'static,
    V: Send + Sync + Clone + Cacheable + 'static,
{
    Cache::try_from_config(config)
}

pub fn new_cache_for_test<K, V>() -> Cache<K, V>
where
    K: Send + Sync + Clone + Hash + Eq + 'static,
    V: Send + Sync + Clone + Cacheable + 'static,
{
    Cache::Unbounded(UnboundedCache::new())
}
