//! Session decision engine.
//!
//! Decides, per request, between validating an existing session, minting a
//! new one from trusted claims, and denying. The engine holds no state of its
//! own; every session lives in the injected [`SessionStore`].
//!
//! | cookie | store says | claims     | decision            |
//! |--------|------------|------------|---------------------|
//! | yes    | present    | (ignored)  | `Admit`             |
//! | yes    | absent     | (ignored)  | `RejectExpired`     |
//! | no     | -          | incomplete | `Deny`              |
//! | no     | -          | complete   | `AdmitNewSession`   |
//!
//! A store failure during the existence check is never read as "absent" or
//! "present": it surfaces as [`SessionError::StoreUnavailable`].

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_SESSION_TTL, SessionConfig};
use crate::error::{SessionError, SessionResult};
use crate::record::{Claims, SessionRecord};
use crate::store::SessionStore;
use crate::token::{OsTokenGenerator, SessionId, TokenGenerator};

/// Validity of a presented session, derived from store presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionValidity {
    Active,
    Absent,
}

impl SessionValidity {
    fn from_presence(exists: bool) -> Self {
        if exists { Self::Active } else { Self::Absent }
    }
}

/// How a cookie naming a dead session interacts with claims on the same
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookiePolicy {
    /// Claims are never consulted once a cookie is present; a stale cookie
    /// is rejected even alongside valid claims.
    #[default]
    CookieTakesPrecedence,
    /// A stale cookie falls through to claims-based admission.
    FallBackToClaims,
}

/// Outcome of a session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No cookie and missing or incomplete claims
    Deny,
    /// Cookie names a live session
    Admit,
    /// Cookie names no live session
    RejectExpired,
    /// A new session was minted and persisted
    AdmitNewSession {
        sid: SessionId,
        record: SessionRecord,
    },
}

impl Decision {
    pub fn status_code(&self) -> u16 {
        if self.is_admitted() { 200 } else { 401 }
    }

    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit | Self::AdmitNewSession { .. })
    }

    /// The id the client must be handed as a cookie, if any.
    pub fn new_session(&self) -> Option<&SessionId> {
        match self {
            Self::AdmitNewSession { sid, .. } => Some(sid),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Deny => "deny",
            Self::Admit => "admit",
            Self::RejectExpired => "reject_expired",
            Self::AdmitNewSession { .. } => "admit_new_session",
        }
    }
}

/// The session state machine.
pub struct SessionEngine {
    store: Arc<dyn SessionStore>,
    generator: Arc<dyn TokenGenerator>,
    ttl: Duration,
    cookie_policy: CookiePolicy,
}

impl SessionEngine {
    /// Engine over `store` with OS-random ids, an 8 hour TTL and cookie
    /// precedence.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            generator: Arc::new(OsTokenGenerator),
            ttl: DEFAULT_SESSION_TTL,
            cookie_policy: CookiePolicy::default(),
        }
    }

    pub fn from_config(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        Self::new(store)
            .with_ttl(config.ttl)
            .with_cookie_policy(config.cookie_policy)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn TokenGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_cookie_policy(mut self, policy: CookiePolicy) -> Self {
        self.cookie_policy = policy;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Look up the session a cookie names.
    ///
    /// A value that is not shaped like an issued id cannot name a session
    /// and is reported absent without a store round-trip.
    pub async fn validity(&self, cookie: &str) -> SessionResult<SessionValidity> {
        let Some(sid) = SessionId::parse(cookie) else {
            debug!("Malformed session cookie");
            return Ok(SessionValidity::Absent);
        };

        let exists = self.store.exists(&sid).await.map_err(|e| {
            warn!(session = sid.redacted(), error = %e, "Session existence check failed");
            SessionError::StoreUnavailable(e)
        })?;

        Ok(SessionValidity::from_presence(exists))
    }

    /// Decide the outcome for one request.
    pub async fn decide(
        &self,
        cookie: Option<&str>,
        claims: Option<&Claims>,
    ) -> SessionResult<Decision> {
        let decision = match cookie.filter(|c| !c.is_empty()) {
            Some(cookie) => self.decide_with_cookie(cookie, claims).await?,
            None => self.decide_with_claims(claims).await?,
        };

        debug!(decision = decision.label(), "Session decision");
        Ok(decision)
    }

    async fn decide_with_cookie(
        &self,
        cookie: &str,
        claims: Option<&Claims>,
    ) -> SessionResult<Decision> {
        match self.validity(cookie).await? {
            SessionValidity::Active => Ok(Decision::Admit),
            SessionValidity::Absent => match self.cookie_policy {
                CookiePolicy::CookieTakesPrecedence => Ok(Decision::RejectExpired),
                CookiePolicy::FallBackToClaims => match claims.and_then(Claims::to_record) {
                    Some(record) => self.mint(record).await,
                    None => Ok(Decision::RejectExpired),
                },
            },
        }
    }

    async fn decide_with_claims(&self, claims: Option<&Claims>) -> SessionResult<Decision> {
        match claims.and_then(Claims::to_record) {
            Some(record) => self.mint(record).await,
            None => Ok(Decision::Deny),
        }
    }

    /// Generate an id, persist the record, and only then report admission.
    async fn mint(&self, record: SessionRecord) -> SessionResult<Decision> {
        let sid = self.generator.generate()?;

        self.store
            .set_with_ttl(&sid, &record, self.ttl)
            .await
            .map_err(|e| {
                warn!(user = %record.user, error = %e, "Failed to persist new session");
                SessionError::StoreWrite(e)
            })?;

        info!(
            session = sid.redacted(),
            user = %record.user,
            dir = %record.dir,
            ttl_secs = self.ttl.as_secs(),
            "Session created"
        );

        Ok(Decision::AdmitNewSession { sid, record })
    }
}
