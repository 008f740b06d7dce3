//! Cache configuration

use std::path::PathBuf;

/// Configuration for an [`MCache`](crate::MCache) instance
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Max entries in each index's LRU
    pub lru_cache_size: usize,
    /// Advisory cap on the number of open indexes (logged, not enforced)
    pub max_index_count: usize,
    /// Advisory cap on stored documents per index (logged, not enforced)
    pub max_index_size: usize,
    /// Directory containing the index files
    pub data_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            lru_cache_size: 10_000,
            max_index_count: 100_000,
            max_index_size: 100_000,
            data_dir: PathBuf::from("./.mcache"),
        }
    }
}
