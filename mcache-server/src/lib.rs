//! mcache HTTP Server
//!
//! A thin HTTP/SSE wrapper around `mcache-core`:
//!
//! - `POST /i/:index_id` — create an index
//! - `PUT /i/:index_id` — merge documents (JSON array)
//! - `DELETE /i/:index_id` — soft-delete by ID (JSON array)
//! - `GET /i/:index_id/m/:manifest_id/@/:updated_after` — manifest query
//! - `GET /docs/:updated_after` — token-authed query + SSE subscription
//!
//! # Example
//!
//! ```ignore
//! use mcache_server::{McacheServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     let server = McacheServer::new(config).await.unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use state::AppState;
pub use telemetry::init_logging;

use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// mcache HTTP server
pub struct McacheServer {
    /// Application state
    state: Arc<AppState>,
    /// Configured router
    router: Router,
}

impl McacheServer {
    /// Create a new server with the given configuration.
    ///
    /// Opens the cache (scanning the data directory) before any socket is
    /// bound; initialization failures surface here.
    pub async fn new(config: ServerConfig) -> mcache_core::Result<Self> {
        let state = Arc::new(AppState::new(config).await?);
        let router = routes::build_router(state.clone());
        Ok(Self { state, router })
    }

    /// Get a reference to the application state
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Get the router for testing
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.state.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;

        info!(
            addr = %addr,
            data_dir = %self.state.config.data_dir.display(),
            indexes = self.state.cache.index_ids().await.len(),
            "mcache server starting"
        );

        axum::serve(listener, self.router).await
    }
}
