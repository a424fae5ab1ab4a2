//! Server configuration.
//!
//! Loaded from an optional TOML file, then overridden from the environment
//! (a `.env` file is honored if present):
//!
//! ```toml
//! [server]
//! listen = "127.0.0.1:8081"
//!
//! [session]
//! ttl_secs = 28800
//!
//! [claims]
//! subject = "X-Jwt-Claim-Sub"
//! audience = "X-Jwt-Claim-Aud"
//!
//! [store]
//! backend = "redis"
//!
//! [store.redis]
//! url = "redis://127.0.0.1:6379"
//! command_timeout_ms = 500
//!
//! [log]
//! level = "info"
//! format = "json"
//! ```

use http::HeaderName;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use turnstile_log::LogConfig;
use turnstile_redis::{RedisConfig, RedisConfigBuilder};
use turnstile_session::SessionConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration of the gatekeeper process.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ListenConfig,
    pub session: SessionConfig,
    pub claims: ClaimHeaders,
    pub store: StoreConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub listen: SocketAddr,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8081)),
        }
    }
}

/// Request headers carrying the identity asserted by the fronting proxy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClaimHeaders {
    /// Becomes the session's `user`
    pub subject: String,
    /// Becomes the session's `dir`
    pub audience: String,
}

impl Default for ClaimHeaders {
    fn default() -> Self {
        Self {
            subject: "X-Jwt-Claim-Sub".to_string(),
            audience: "X-Jwt-Claim-Aud".to_string(),
        }
    }
}

/// Which session store backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// Process-local; sessions do not survive a restart or span replicas
    Memory,
}

impl StoreBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "redis" => Some(Self::Redis),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis: RedisConfig,
}

impl ServerConfig {
    /// Load from `path` (if any), apply environment overrides, and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok(); // Ignore if .env doesn't exist

        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let config = config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply `TURNSTILE_*`, `REDIS_*` and `TURNSTILE_LOG_*` overrides.
    ///
    /// A set variable whose value does not parse is a validation error.
    pub fn merge_env(self) -> Result<Self> {
        let mut config = self.merge_vars(|key| std::env::var(key).ok())?;
        config.store.redis = RedisConfigBuilder::from_config(config.store.redis)
            .merge_env()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?
            .build();
        config.log = config
            .log
            .merge_env()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        Ok(config)
    }

    fn merge_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(listen) = parse_var(&var, "TURNSTILE_LISTEN", |s| s.parse().ok())? {
            self.server.listen = listen;
        }

        if let Some(secs) = parse_var(&var, "TURNSTILE_SESSION_TTL_SECS", |s| s.parse().ok())? {
            self.session.ttl = Duration::from_secs(secs);
        }

        if let Some(namespace) = var("TURNSTILE_SESSION_NAMESPACE") {
            self.session.namespace = Some(namespace);
        }

        if let Some(retries) =
            parse_var(&var, "TURNSTILE_SESSION_MAX_RETRIES", |s| s.parse().ok())?
        {
            self.session.max_retries = retries;
        }

        if let Some(backend) = parse_var(&var, "TURNSTILE_STORE_BACKEND", StoreBackend::parse)? {
            self.store.backend = backend;
        }

        if let Some(header) = var("TURNSTILE_CLAIM_SUBJECT_HEADER") {
            self.claims.subject = header;
        }

        if let Some(header) = var("TURNSTILE_CLAIM_AUDIENCE_HEADER") {
            self.claims.audience = header;
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.session
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        for header in [&self.claims.subject, &self.claims.audience] {
            HeaderName::from_bytes(header.as_bytes()).map_err(|_| {
                ConfigError::ValidationError(format!("invalid claim header name: {:?}", header))
            })?;
        }

        if self.store.backend == StoreBackend::Redis {
            self.store
                .redis
                .validate()
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }

        Ok(())
    }
}

fn parse_var<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>> {
    var(key)
        .map(|value| {
            parse(&value).ok_or_else(|| {
                ConfigError::ValidationError(format!("invalid value for {}: {:?}", key, value))
            })
        })
        .transpose()
}
