use pivotspace_cache::CacheConfig;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BucketIndexConfig {
    /// Number of pivots the enclosing index froze; every container created
    /// by this index declares it.
    pub pivot_count: usize,
    /// Configuration for the bucket byte cache in front of the store.
    #[serde(default)]
    pub cache: CacheConfig,
}
