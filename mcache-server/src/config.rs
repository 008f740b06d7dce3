//! Server configuration

use clap::Parser;
use mcache_core::CacheConfig;
use std::net::SocketAddr;
use std::path::PathBuf;

/// mcache HTTP server configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "mcache-server")]
#[command(about = "HTTP-accessible document cache server")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "MCACHE_LISTEN_ADDR", default_value = "127.0.0.1:1337")]
    pub listen_addr: SocketAddr,

    /// Directory containing the index files
    #[arg(long, env = "MCACHE_DATA_DIR", default_value = "./.mcache")]
    pub data_dir: PathBuf,

    /// Max entries in each index's LRU cache
    #[arg(long, env = "MCACHE_LRU_CACHE_SIZE", default_value = "10000")]
    pub lru_cache_size: usize,

    /// Advisory cap on the number of open indexes
    #[arg(long, env = "MCACHE_MAX_INDEX_COUNT", default_value = "100000")]
    pub max_index_count: usize,

    /// Advisory cap on stored documents per index
    #[arg(long, env = "MCACHE_MAX_INDEX_SIZE", default_value = "100000")]
    pub max_index_size: usize,

    /// Enable CORS (Cross-Origin Resource Sharing)
    #[arg(long, env = "MCACHE_CORS_ENABLED", default_value = "false")]
    pub cors_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MCACHE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    /// Lower the cache-relevant options into a core configuration
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            lru_cache_size: self.lru_cache_size,
            max_index_count: self.max_index_count,
            max_index_size: self.max_index_size,
            data_dir: self.data_dir.clone(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:1337".parse().expect("valid default address"),
            data_dir: PathBuf::from("./.mcache"),
            lru_cache_size: 10_000,
            max_index_count: 100_000,
            max_index_size: 100_000,
            cors_enabled: false,
            log_level: "info".to_string(),
        }
    }
}
