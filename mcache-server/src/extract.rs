//! Request extractors
//!
//! The subscription endpoint authenticates with an opaque token of the form
//! `<indexID>:<manifestID>` carried in the `Authorization` header, with an
//! optional `Bearer ` scheme. Manifest IDs may themselves contain `:`, so
//! the token splits at the first colon only.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{HeaderMap, AUTHORIZATION};
use axum::http::request::Parts;
use std::sync::Arc;

use crate::error::ServerError;
use crate::state::AppState;

/// Verified `(index, manifest)` pair from the subscriber token
#[derive(Debug, Clone)]
pub struct SubscriberToken {
    /// Index the subscriber reads from
    pub index_id: String,
    /// Manifest scoping the subscription
    pub manifest_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SubscriberToken {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ServerError::unauthorized("subscriber token required"))?;
        let (index_id, manifest_id) = token
            .split_once(':')
            .ok_or_else(|| ServerError::unauthorized("malformed subscriber token"))?;
        if index_id.is_empty() || manifest_id.is_empty() {
            return Err(ServerError::unauthorized("malformed subscriber token"));
        }
        Ok(SubscriberToken {
            index_id: index_id.to_string(),
            manifest_id: manifest_id.to_string(),
        })
    }
}

/// Extract the raw token with HTTP-standard tolerance:
/// case-insensitive optional `Bearer ` scheme, trimmed whitespace.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = if auth.len() >= 7 && auth[..7].eq_ignore_ascii_case("bearer ") {
        auth[7..].trim()
    } else {
        auth
    };
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
