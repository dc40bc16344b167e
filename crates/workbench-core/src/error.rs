//! Error types for `Workbench` core library.

use thiserror::Error;

use crate::store::StoreError;
use crate::transport::TransportError;

/// Result type alias using `Workbench` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `Workbench` operations.
///
/// Stale tree paths and session ids are never errors; only the adapters
/// at the edges (store, transport, config files) can fail.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistent store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Transport channel error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
