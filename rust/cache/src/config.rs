use serde::{Deserialize, Serialize};

fn default_capacity() -> usize {
    1000
}

#[derive(Deserialize, Debug, Clone, Serialize)]
pub struct UnboundedCacheConfig {}

#[derive(Deserialize, Debug, Clone, Serialize)]
pub struct LruConfig {
    /// Capacity in entries.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

#[derive(Deserialize, Debug, Clone, Serialize)]
pub struct LfuConfig {
    /// Capacity in entries.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

#[derive(Deserialize, Debug, Clone, Serialize)]
pub struct WeightedLruConfig {
    /// Capacity in weighted units (bytes for serialized buckets).
    pub capacity_bytes: usize,
}

#[derive(Deserialize, Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheConfig {
    Unbounded(UnboundedCacheConfig),
    Lru(LruConfig),
    Lfu(LfuConfig),
    WeightedLru(WeightedLruConfig),
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig::Unbounded(UnboundedCacheConfig {})
    }
}
