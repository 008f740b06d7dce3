//! HTTP route handlers and router configuration

mod admin;
mod docs;
mod index;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the main application router
pub fn build_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        // Health check
        .route("/health", get(admin::health))
        // Index management and writes
        .route(
            "/i/:index_id",
            post(index::create)
                .put(index::update)
                .delete(index::soft_delete),
        )
        // Manifest-scoped query
        .route(
            "/i/:index_id/m/:manifest_id/@/:updated_after",
            get(index::query),
        )
        // Token-authed initial query + SSE subscription
        .route("/docs/:updated_after", get(docs::subscribe));

    let cors_enabled = state.config.cors_enabled;
    let mut router = router.with_state(state);

    router = router.layer(TraceLayer::new_for_http());

    if cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}
