use thiserror::Error;

/// Result type for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("unknown placement: {0}")]
    UnknownPlacement(String),
}
