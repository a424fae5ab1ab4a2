//! Session gatekeeping for turnstile.
//!
//! Sits behind a trusted identity proxy and decides, per request, whether
//! the caller holds a live session, should be issued a new one from the
//! proxy's identity claims, or must be turned away.
//!
//! # Features
//!
//! - `redis` - Redis session storage (enabled by default)
//! - `testing` - call-recording and fault-injecting test doubles
//!
//! # Examples
//!
//! ```no_run
//! use turnstile_session::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SessionError> {
//!     let engine = SessionEngine::new(Arc::new(MemorySessionStore::new()));
//!
//!     // First visit: the proxy asserted an identity
//!     let claims = Claims::new("alice", "teamA");
//!     let decision = engine.decide(None, Some(&claims)).await?;
//!     let sid = decision.new_session().cloned().expect("new session");
//!
//!     // Later visits present the cookie
//!     let decision = engine.decide(Some(sid.as_str()), None).await?;
//!     assert_eq!(decision, Decision::Admit);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cookie;
pub mod engine;
pub mod error;
pub mod memory_store;
pub mod record;
pub mod store;
pub mod token;

#[cfg(feature = "redis")]
pub mod redis_session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{DEFAULT_SESSION_TTL, MAX_SESSION_TTL, SessionConfig};
pub use cookie::{CookieSettings, SameSite, find_cookie};
pub use engine::{CookiePolicy, Decision, SessionEngine, SessionValidity};
pub use error::{SessionError, SessionResult, StoreError};
pub use memory_store::MemorySessionStore;
pub use record::{Claims, SessionRecord};
pub use store::SessionStore;
pub use token::{OsTokenGenerator, SessionId, TokenGenerator, generate_session_id};

#[cfg(feature = "redis")]
pub use redis_session::RedisSessionStore;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::engine::{CookiePolicy, Decision, SessionEngine};
    pub use crate::error::{SessionError, SessionResult, StoreError};
    pub use crate::memory_store::MemorySessionStore;
    pub use crate::record::{Claims, SessionRecord};
    pub use crate::store::SessionStore;
    pub use crate::token::{SessionId, TokenGenerator, generate_session_id};

    #[cfg(feature = "redis")]
    pub use crate::redis_session::RedisSessionStore;
}
