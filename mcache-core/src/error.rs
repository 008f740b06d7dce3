//! Error types for mcache-core

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// The requested index is not registered
    #[error("no such index: {0}")]
    NoSuchIndex(String),

    /// An index with this ID is already open
    #[error("index already exists: {0}")]
    IndexExists(String),

    /// Document, manifest, or connection lookup failure
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored value or manifest body is not well-formed
    #[error("decode error: {0}")]
    Decode(String),

    /// Durable store I/O or transaction failure
    #[error("store error: {0}")]
    Store(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }
}
