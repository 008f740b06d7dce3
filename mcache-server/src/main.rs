//! mcache server CLI
//!
//! Run with: `cargo run -p mcache-server -- --help`

use clap::Parser;
use mcache_server::{init_logging, McacheServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();
    init_logging(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.listen_addr,
        data_dir = %config.data_dir.display(),
        lru_cache_size = config.lru_cache_size,
        cors = config.cors_enabled,
        "Starting mcache server"
    );

    let server = McacheServer::new(config).await?;
    server.run().await.map_err(Into::into)
}
