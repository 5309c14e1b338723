use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use billboard_core::StorageError;
use billboard_delivery::DeliveryError;
use serde::Serialize;
use tracing::warn;

pub type Result<T> = std::result::Result<T, AppError>;

/// Errors a handler can answer with.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Delivery(DeliveryError::UnknownPlacement(placement)) => {
                warn!(placement = %placement, "Rejected unknown placement");
                StatusCode::BAD_REQUEST
            }
        };

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
