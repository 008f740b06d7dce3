//! Index management, writes, and manifest-scoped queries

use crate::error::Result;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use mcache_core::{doc_set, DocSet, Document, Timestamp};
use serde_json::json;
use std::sync::Arc;

/// `POST /i/:index_id` — create an index; 409 when it already exists
pub async fn create(
    State(state): State<Arc<AppState>>,
    Path(index_id): Path<String>,
) -> Result<impl IntoResponse> {
    let index = state.cache.create_index(&index_id).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": index.id() }))))
}

/// `PUT /i/:index_id` — merge a JSON array of documents into the index.
///
/// Responds with the set actually written, timestamps stamped.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(index_id): Path<String>,
    Json(docs): Json<Vec<Document>>,
) -> Result<Json<DocSet>> {
    let written = state.cache.update(&index_id, doc_set(docs)).await?;
    Ok(Json(written))
}

/// `DELETE /i/:index_id` — replace a JSON array of IDs with tombstones
pub async fn soft_delete(
    State(state): State<Arc<AppState>>,
    Path(index_id): Path<String>,
    Json(ids): Json<Vec<String>>,
) -> Result<Json<DocSet>> {
    let written = state
        .cache
        .soft_delete(&index_id, ids.into_iter().collect())
        .await?;
    Ok(Json(written))
}

/// `GET /i/:index_id/m/:manifest_id/@/:updated_after` — manifest-scoped query
pub async fn query(
    State(state): State<Arc<AppState>>,
    Path((index_id, manifest_id, updated_after)): Path<(String, String, Timestamp)>,
) -> Result<Json<DocSet>> {
    let results = state
        .cache
        .query(&index_id, &manifest_id, updated_after)
        .await?;
    Ok(Json(results))
}
