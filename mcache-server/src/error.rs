//! Server error types with HTTP status code mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mcache_core::Error as CacheError;
use serde::Serialize;
use thiserror::Error;

/// Server error type wrapping core errors and providing HTTP status mapping
#[derive(Error, Debug)]
pub enum ServerError {
    /// Core cache error
    #[error("{0}")]
    Cache(#[from] CacheError),

    /// Generic bad request error
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or malformed subscriber token
    #[error("{0}")]
    Unauthorized(String),
}

impl ServerError {
    /// Map error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 404 - routing and lookup failures
            ServerError::Cache(CacheError::NoSuchIndex(_)) => StatusCode::NOT_FOUND,
            ServerError::Cache(CacheError::NotFound(_)) => StatusCode::NOT_FOUND,

            // 409 - create of an existing index
            ServerError::Cache(CacheError::IndexExists(_)) => StatusCode::CONFLICT,

            // 400 - client errors
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,

            // 401 - token failures
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

            // 500 - stored-state and I/O failures
            ServerError::Cache(CacheError::Decode(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Cache(CacheError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Cache(CacheError::Json(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ServerError::BadRequest(msg.into())
    }

    /// Create an unauthorized error (401)
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ServerError::Unauthorized(msg.into())
    }
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// HTTP status code
    pub status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
            status: status.as_u16(),
        };
        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            format!(r#"{{"error":"{}","status":{}}}"#, self, status.as_u16())
        });
        (status, [("content-type", "application/json")], json).into_response()
    }
}

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ServerError>;
