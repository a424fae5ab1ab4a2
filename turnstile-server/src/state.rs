//! Shared per-process state handed to every request.

use std::sync::Arc;
use tracing::info;
use turnstile_session::{
    CookieSettings, MemorySessionStore, RedisSessionStore, SessionEngine, SessionStore,
};

use crate::config::{ClaimHeaders, ServerConfig, StoreBackend};
use crate::error::Result;

pub struct AppState {
    pub engine: SessionEngine,
    pub cookie: CookieSettings,
    pub claim_headers: ClaimHeaders,
}

impl AppState {
    pub fn new(engine: SessionEngine, cookie: CookieSettings, claim_headers: ClaimHeaders) -> Self {
        Self {
            engine,
            cookie,
            claim_headers,
        }
    }

    /// Build state around an already constructed store.
    pub fn with_store(store: Arc<dyn SessionStore>, config: &ServerConfig) -> Self {
        Self::new(
            SessionEngine::from_config(store, &config.session),
            config.session.cookie.clone(),
            config.claims.clone(),
        )
    }

    /// Connect the configured backend and build state around it.
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        let store: Arc<dyn SessionStore> = match config.store.backend {
            StoreBackend::Redis => {
                let store =
                    RedisSessionStore::connect(config.store.redis.clone(), &config.session).await?;
                info!(
                    pool_size = config.store.redis.pool_size,
                    "Connected Redis session store"
                );
                Arc::new(store)
            }
            StoreBackend::Memory => {
                info!("Using in-memory session store");
                Arc::new(MemorySessionStore::new())
            }
        };

        Ok(Self::with_store(store, config))
    }
}
