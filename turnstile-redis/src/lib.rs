//! # Turnstile Redis
//!
//! Pooled Redis access for the session gatekeeper.
//!
//! Every command issued through [`RedisService`] is bounded by the configured
//! command timeout, so a stalled Redis surfaces as [`RedisError::Timeout`]
//! instead of hanging the request path.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use turnstile_redis::{RedisConfig, RedisService};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::builder()
//!         .url("redis://localhost:6379")
//!         .command_timeout(Duration::from_millis(500))
//!         .build();
//!
//!     let redis = RedisService::new(config).await?;
//!     redis.set_ex("key", "value", Duration::from_secs(60)).await?;
//!     assert!(redis.exists("key").await?);
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod pool;
mod service;

pub use config::{RedisConfig, RedisConfigBuilder};
pub use error::{RedisError, Result};
pub use pool::{RedisConnection, RedisPool, RedisPoolBuilder};
pub use service::RedisService;

// Re-export redis crate for convenience
pub use redis;
