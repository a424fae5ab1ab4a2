//! Redis session storage implementation.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use turnstile_redis::{RedisConfig, RedisError, RedisService};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult, StoreError};
use crate::record::SessionRecord;
use crate::store::SessionStore;
use crate::token::SessionId;

/// Redis-backed session store.
///
/// Sessions live under the bare session id, or under `"{namespace}:{sid}"`
/// when a namespace is configured, as a JSON string written with `SETEX`.
/// Redis owns expiry.
///
/// # Examples
///
/// ```no_run
/// use turnstile_session::{RedisSessionStore, SessionConfig};
/// use turnstile_redis::RedisConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = RedisSessionStore::connect(
///     RedisConfig::new("redis://localhost:6379"),
///     &SessionConfig::default(),
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub struct RedisSessionStore {
    redis: Arc<RedisService>,
    namespace: Option<String>,
    max_retries: u32,
}

impl RedisSessionStore {
    /// Wrap an existing Redis service.
    pub fn new(redis: Arc<RedisService>) -> Self {
        Self {
            redis,
            namespace: None,
            max_retries: 0,
        }
    }

    /// Build the pool and apply the session settings.
    pub async fn connect(redis_config: RedisConfig, config: &SessionConfig) -> SessionResult<Self> {
        let redis = RedisService::new(redis_config).await.map_err(|e| match e {
            RedisError::Config(msg) => SessionError::Config(msg),
            other => SessionError::StoreUnavailable(other.into()),
        })?;

        let mut store = Self::new(Arc::new(redis)).with_max_retries(config.max_retries);
        if let Some(namespace) = &config.namespace {
            store = store.with_namespace(namespace.clone());
        }
        Ok(store)
    }

    /// Prefix keys with `namespace:`.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Retry transient failures up to `max_retries` extra times.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Get the session key for a given session ID.
    fn session_key(&self, sid: &SessionId) -> String {
        session_key(self.namespace.as_deref(), sid)
    }

    async fn with_retry<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = turnstile_redis::Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(op, attempt, error = %e, "Retrying Redis session operation");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn session_key(namespace: Option<&str>, sid: &SessionId) -> String {
    match namespace {
        Some(ns) => format!("{}:{}", ns, sid),
        None => sid.to_string(),
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn exists(&self, sid: &SessionId) -> Result<bool, StoreError> {
        let key = self.session_key(sid);
        let key = key.as_str();
        let redis = &self.redis;

        self.with_retry("exists", move || redis.exists(key)).await
    }

    async fn set_with_ttl(
        &self,
        sid: &SessionId,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let key = self.session_key(sid);
        let key = key.as_str();
        let json = record.to_json()?;
        let json = json.as_str();
        let redis = &self.redis;

        // Safe to repeat: the key is freshly generated and the value identical
        self.with_retry("set_with_ttl", move || redis.set_ex(key, json, ttl))
            .await
    }

    async fn get(&self, sid: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let key = self.session_key(sid);
        let key = key.as_str();
        let redis = &self.redis;

        let json: Option<String> = self
            .with_retry("get", move || redis.get_value::<String>(key))
            .await?;

        json.map(|json| SessionRecord::from_json(&json)).transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.redis.health_check().await.map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::generate_session_id;

    #[test]
    fn test_session_key_without_namespace_is_bare_id() {
        let sid = generate_session_id().unwrap();
        assert_eq!(session_key(None, &sid), sid.as_str());
    }

    #[test]
    fn test_session_key_with_namespace() {
        let sid = SessionId::parse("0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(
            session_key(Some("gate"), &sid),
            "gate:0123456789abcdef0123456789abcdef"
        );
    }

    async fn stalled_store(max_retries: u32) -> RedisSessionStore {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let config = RedisConfig::builder()
            .url(format!("redis://{}", addr))
            .command_timeout(Duration::from_millis(200))
            .build();
        let manager =
            bb8_redis::RedisConnectionManager::new(config.connection_url()).unwrap();
        let pool = bb8::Pool::builder().max_size(1).build_unchecked(manager);

        RedisSessionStore::new(Arc::new(RedisService::from_pool(config, pool)))
            .with_max_retries(max_retries)
    }

    #[tokio::test]
    async fn test_stalled_redis_surfaces_as_timeout() {
        let store = stalled_store(0).await;
        let sid = generate_session_id().unwrap();

        assert!(matches!(store.exists(&sid).await, Err(StoreError::Timeout)));
        assert!(matches!(store.get(&sid).await, Err(StoreError::Timeout)));
        assert!(matches!(store.ping().await, Err(StoreError::Timeout)));
    }

    #[tokio::test]
    async fn test_stalled_redis_times_out_after_retries() {
        let store = stalled_store(2).await;
        let sid = generate_session_id().unwrap();

        let started = std::time::Instant::now();
        let result = store
            .set_with_ttl(&sid, &SessionRecord::new("alice", "teamA"), Duration::from_secs(30))
            .await;

        assert!(matches!(result, Err(StoreError::Timeout)));
        assert!(started.elapsed() >= Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_sub_second_ttl_is_rejected_without_retry() {
        let store = stalled_store(3).await;
        let sid = generate_session_id().unwrap();

        let started = std::time::Instant::now();
        let result = store
            .set_with_ttl(&sid, &SessionRecord::new("alice", "teamA"), Duration::from_millis(500))
            .await;

        assert!(matches!(result, Err(StoreError::Command(_))));
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_round_trip_against_redis() {
        let store = RedisSessionStore::connect(
            RedisConfig::new("redis://localhost:6379"),
            &SessionConfig::default().with_namespace("turnstile-test"),
        )
        .await
        .unwrap();

        let sid = generate_session_id().unwrap();
        let record = SessionRecord::new("alice", "teamA");

        assert!(!store.exists(&sid).await.unwrap());
        store
            .set_with_ttl(&sid, &record, Duration::from_secs(30))
            .await
            .unwrap();
        assert!(store.exists(&sid).await.unwrap());
        assert_eq!(store.get(&sid).await.unwrap(), Some(record));

        let ttl = store.redis.ttl(&store.session_key(&sid)).await.unwrap().unwrap();
        assert!(ttl <= Duration::from_secs(30) && ttl >= Duration::from_secs(28));
    }
}
