// Error types for the gatekeeper server

use thiserror::Error;
use turnstile_log::LogError;
use turnstile_session::SessionError;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session store error: {0}")]
    Session(#[from] SessionError),

    #[error("Logging error: {0}")]
    Log(#[from] LogError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
