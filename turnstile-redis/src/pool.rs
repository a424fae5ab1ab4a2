//! Redis connection pool.

use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use redis::aio::MultiplexedConnection;
use std::ops::{Deref, DerefMut};
use tracing::info;

use crate::{RedisConfig, RedisError, Result};

/// Type alias for the connection pool.
pub type RedisPool = Pool<RedisConnectionManager>;

/// A pooled Redis connection.
pub struct RedisConnection<'a> {
    conn: PooledConnection<'a, RedisConnectionManager>,
}

impl<'a> RedisConnection<'a> {
    pub fn new(conn: PooledConnection<'a, RedisConnectionManager>) -> Self {
        Self { conn }
    }
}

impl Deref for RedisConnection<'_> {
    type Target = MultiplexedConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for RedisConnection<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

/// Builder for creating Redis connection pools.
pub struct RedisPoolBuilder {
    config: RedisConfig,
}

impl RedisPoolBuilder {
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }

    /// Build the pool and verify it with a PING.
    ///
    /// An unreachable server fails here, at startup, rather than on the
    /// first request.
    pub async fn build(self) -> Result<RedisPool> {
        self.config.validate()?;

        let manager = RedisConnectionManager::new(self.config.connection_url())
            .map_err(|e| RedisError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(self.config.pool_size)
            .min_idle(self.config.min_idle)
            .connection_timeout(self.config.connection_timeout)
            .build(manager)
            .await
            .map_err(|e| RedisError::Connection(e.to_string()))?;

        // Scoped so the connection returns to the pool before we hand it out
        {
            let mut conn = pool.get().await?;
            let _: String = tokio::time::timeout(
                self.config.command_timeout,
                redis::cmd("PING").query_async(&mut *conn),
            )
            .await?
            .map_err(|e| RedisError::Connection(e.to_string()))?;
        }

        info!(
            pool_size = self.config.pool_size,
            url = %self.config.url,
            "Redis connection pool created"
        );

        Ok(pool)
    }
}
