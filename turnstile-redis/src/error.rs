//! Redis error types.

use thiserror::Error;

/// Result type for Redis operations.
pub type Result<T> = std::result::Result<T, RedisError>;

/// Redis errors.
#[derive(Debug, Error)]
pub enum RedisError {
    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Pool error.
    #[error("Pool error: {0}")]
    Pool(String),

    /// Command error.
    #[error("Command error: {0}")]
    Command(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The command did not complete within the command timeout.
    #[error("Operation timed out")]
    Timeout,

    /// Underlying Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl RedisError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout | Self::Pool(_) => true,
            Self::Redis(e) => e.is_io_error() || e.is_timeout() || e.is_connection_dropped(),
            Self::Command(_) | Self::Config(_) => false,
        }
    }

    /// Check if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Redis(e) => e.is_timeout(),
            _ => false,
        }
    }
}

impl<E> From<bb8::RunError<E>> for RedisError
where
    E: std::error::Error + 'static,
{
    fn from(err: bb8::RunError<E>) -> Self {
        match err {
            bb8::RunError::TimedOut => Self::Timeout,
            bb8::RunError::User(e) => Self::Pool(e.to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for RedisError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(RedisError::Timeout.is_retryable());
        assert!(RedisError::Connection("refused".into()).is_retryable());
        assert!(!RedisError::Command("WRONGTYPE".into()).is_retryable());
        assert!(!RedisError::Config("bad url".into()).is_retryable());
    }

    #[test]
    fn test_pool_timeout_maps_to_timeout() {
        let err: RedisError = bb8::RunError::<redis::RedisError>::TimedOut.into();
        assert!(err.is_timeout());
    }
}
