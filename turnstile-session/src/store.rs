//! Session store contract.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreError;
use crate::record::SessionRecord;
use crate::token::SessionId;

/// Adapter over a shared, expiring key-value store.
///
/// Every operation is single-key. The store owns expiry: entries written
/// with a TTL disappear on their own and nothing here deletes them.
/// Implementations must bound their network calls and report an elapsed
/// bound as [`StoreError::Timeout`].
///
/// # Examples
///
/// ```ignore
/// use turnstile_session::{SessionStore, SessionRecord, generate_session_id};
/// use std::time::Duration;
///
/// async fn example(store: &dyn SessionStore) -> Result<(), Box<dyn std::error::Error>> {
///     let sid = generate_session_id()?;
///     store
///         .set_with_ttl(&sid, &SessionRecord::new("alice", "teamA"), Duration::from_secs(60))
///         .await?;
///     assert!(store.exists(&sid).await?);
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Whether a live entry exists under `sid`.
    async fn exists(&self, sid: &SessionId) -> Result<bool, StoreError>;

    /// Write `record` under `sid`, expiring after `ttl`.
    ///
    /// Stores may keep coarser expiry than `ttl` carries. Redis keeps whole
    /// seconds: the fraction is dropped and a `ttl` under one second is
    /// rejected as [`StoreError::Command`].
    async fn set_with_ttl(
        &self,
        sid: &SessionId,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Read the record stored under `sid`, `None` if absent or expired.
    async fn get(&self, sid: &SessionId) -> Result<Option<SessionRecord>, StoreError>;

    /// Round-trip to the store, used by health checks.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
