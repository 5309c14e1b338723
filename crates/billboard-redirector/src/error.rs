use billboard_core::StorageError;
use thiserror::Error;

/// Result type for redirector operations.
pub type Result<T> = std::result::Result<T, RedirectorError>;

#[derive(Debug, Clone, Error)]
pub enum RedirectorError {
    #[error("shortlink lookup failed: {0}")]
    Storage(#[from] StorageError),
}
