//! Error types for filtered stores.

use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Reducer error: {0}")]
    Reducer(String),

    #[error("Invalid path expression {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Cannot evaluate {path:?} against a {kind} state")]
    NotATree { path: String, kind: &'static str },

    #[error("Cannot assign through {path:?}: {reason}")]
    Assign { path: String, reason: String },

    #[error("Dispatch issued from a listener while a dispatch is in progress")]
    ReentrantDispatch,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
