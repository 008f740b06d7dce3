//! Application state

use crate::config::ServerConfig;
use mcache_core::MCache;

/// State shared across request handlers
#[derive(Debug)]
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// The cache facade
    pub cache: MCache,
}

impl AppState {
    /// Open the cache over the configured data directory and build the state.
    ///
    /// Scan failures (unreadable data dir, corrupt snapshot) surface here.
    pub async fn new(config: ServerConfig) -> mcache_core::Result<Self> {
        let cache = MCache::open(config.cache_config()).await?;
        Ok(Self { config, cache })
    }
}
