//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// The store could not answer.
///
/// Connection failures, timeouts and protocol errors all land here; callers
/// only need to know that the store did not produce an answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The operation exceeded its time bound
    #[error("Store operation timed out")]
    Timeout,

    /// Could not reach the store
    #[error("Store connection error: {0}")]
    Connection(String),

    /// The store rejected the command or replied with something unexpected
    #[error("Store command error: {0}")]
    Command(String),

    /// A session record could not be encoded or decoded
    #[error("Session record serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Transient failures that a bounded retry may clear.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection(_))
    }
}

#[cfg(feature = "redis")]
impl From<turnstile_redis::RedisError> for StoreError {
    fn from(err: turnstile_redis::RedisError) -> Self {
        use turnstile_redis::RedisError;

        if err.is_timeout() {
            return Self::Timeout;
        }
        match err {
            RedisError::Connection(msg) | RedisError::Pool(msg) => Self::Connection(msg),
            RedisError::Redis(e) if e.is_io_error() || e.is_connection_dropped() => {
                Self::Connection(e.to_string())
            }
            other => Self::Command(other.to_string()),
        }
    }
}

/// Session-level errors surfaced to the HTTP adapter.
///
/// Incomplete claims are not an error: they resolve to a denial inside the
/// engine.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Existence check failed; the session's validity is unknown
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    /// A freshly minted session could not be persisted
    #[error("Failed to persist new session: {0}")]
    StoreWrite(#[source] StoreError),

    /// The OS entropy source failed
    #[error("Session token generation failed: {0}")]
    TokenGeneration(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    /// Status code the HTTP adapter should answer with.
    ///
    /// None of these are authentication failures, so none map to 401.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::StoreUnavailable(_) => 503,
            Self::StoreWrite(_) | Self::TokenGeneration(_) | Self::Config(_) => 500,
        }
    }
}
