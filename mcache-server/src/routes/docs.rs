//! Token-authed document subscription endpoint
//!
//! `GET /docs/:updated_after` answers with an SSE stream: one initial event
//! carrying the manifest-scoped query result, then one event per filtered
//! update batch for as long as the client stays connected. The subscription
//! is registered before the initial query runs, so a commit landing between
//! the two is delivered rather than lost (it may then appear in both the
//! snapshot and the tail; consumers merge by `updatedAt`).

use crate::error::Result;
use crate::extract::SubscriberToken;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use mcache_core::{DocSet, Timestamp};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;

/// `GET /docs/:updated_after` — initial query plus live subscription
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Path(updated_after): Path<Timestamp>,
    token: SubscriberToken,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    // Subscribe first: a commit landing during the initial query is queued
    // on the connection instead of falling into a gap.
    let conn = state
        .cache
        .connect(&token.index_id, &token.manifest_id)
        .await?;
    let initial = state
        .cache
        .query(&token.index_id, &token.manifest_id, updated_after)
        .await?;

    info!(
        index = %token.index_id,
        manifest = %token.manifest_id,
        key = conn.key(),
        updated_after,
        "subscriber attached"
    );

    let initial_stream = stream::iter([Ok::<Event, Infallible>(docset_event(&initial))]);
    let live_stream = stream::unfold(conn, |mut conn| async move {
        let docs = conn.recv().await?;
        Some((Ok(docset_event(&docs)), conn))
    });

    // Dropping the stream (peer disconnect) drops the connection, whose
    // cleanup unregisters the subscriber from the stream registry.
    Ok(Sse::new(initial_stream.chain(live_stream)).keep_alive(KeepAlive::default()))
}

fn docset_event(docs: &DocSet) -> Event {
    Event::default()
        .json_data(docs)
        .unwrap_or_else(|_| Event::default().comment("serialization error"))
}
