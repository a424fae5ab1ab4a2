//! Redis service with bounded command execution.

use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;

use crate::{
    RedisConfig, RedisError, Result,
    pool::{RedisConnection, RedisPool, RedisPoolBuilder},
};

/// Redis service providing a connection pool and the commands the session
/// store needs.
///
/// Each command, including checking a connection out of the pool, runs under
/// `command_timeout`.
pub struct RedisService {
    config: RedisConfig,
    pool: RedisPool,
}

impl RedisService {
    /// Create a new Redis service.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let pool = RedisPoolBuilder::new(config.clone()).build().await?;
        Ok(Self { config, pool })
    }

    /// Create from an existing pool.
    pub fn from_pool(config: RedisConfig, pool: RedisPool) -> Self {
        Self { config, pool }
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Get a connection from the pool.
    pub async fn get(&self) -> Result<RedisConnection<'_>> {
        let conn = self.pool.get().await?;
        Ok(RedisConnection::new(conn))
    }

    async fn bounded<T>(&self, op: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.config.command_timeout, op).await?
    }

    /// Check if the connection is healthy.
    pub async fn health_check(&self) -> Result<()> {
        self.bounded(async {
            let mut conn = self.get().await?;
            let _: String = redis::cmd("PING").query_async(&mut *conn).await?;
            Ok(())
        })
        .await
    }

    /// Get a value.
    pub async fn get_value<T: redis::FromRedisValue>(&self, key: &str) -> Result<Option<T>> {
        self.bounded(async {
            let mut conn = self.get().await?;
            let value: Option<T> = conn.get(key).await?;
            Ok(value)
        })
        .await
    }

    /// Set a value with expiration (`SETEX`).
    ///
    /// Redis expires keys in whole seconds: any fractional part of `ttl` is
    /// dropped, and a `ttl` under one second is rejected.
    pub async fn set_ex<T: redis::ToRedisArgs + Send + Sync>(
        &self,
        key: &str,
        value: T,
        ttl: Duration,
    ) -> Result<()> {
        let secs = ttl.as_secs();
        if secs == 0 {
            return Err(RedisError::Config(format!(
                "expiry must be at least one second, got {}ms",
                ttl.as_millis()
            )));
        }
        self.bounded(async {
            let mut conn = self.get().await?;
            let _: () = conn.set_ex(key, value, secs).await?;
            Ok(())
        })
        .await
    }

    /// Check if a key exists.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.bounded(async {
            let mut conn = self.get().await?;
            let exists: bool = conn.exists(key).await?;
            Ok(exists)
        })
        .await
    }

    /// Remaining TTL of a key, `None` if the key is missing or has no expiry.
    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.bounded(async {
            let mut conn = self.get().await?;
            let ttl: i64 = conn.ttl(key).await?;
            Ok((ttl >= 0).then(|| Duration::from_secs(ttl as u64)))
        })
        .await
    }
}
