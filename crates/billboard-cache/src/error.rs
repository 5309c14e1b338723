pub use billboard_core::CacheError;

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;

pub(crate) fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() || message.to_ascii_lowercase().contains("timed out") {
        CacheError::Timeout(message)
    } else if err.is_connection_dropped() || err.is_connection_refusal() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}
