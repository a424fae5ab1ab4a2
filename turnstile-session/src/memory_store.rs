//! In-process session store.
//!
//! Keeps entries in a map with per-entry deadlines. Expired entries are
//! invisible to reads and purged on the next write. Suitable for tests and
//! single-node development; sessions do not survive a restart and are not
//! shared between processes.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::record::SessionRecord;
use crate::store::SessionStore;
use crate::token::SessionId;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Expiring in-memory session store.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining lifetime of a live entry.
    pub fn ttl(&self, sid: &SessionId) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .read()
            .get(sid.as_str())
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.expires_at - now)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw stored value, as another reader of the store would see it.
    pub fn raw(&self, sid: &SessionId) -> Option<String> {
        let now = Instant::now();
        self.entries
            .read()
            .get(sid.as_str())
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn exists(&self, sid: &SessionId) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(sid.as_str())
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn set_with_ttl(
        &self,
        sid: &SessionId,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let value = record.to_json()?;
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or_else(|| {
            StoreError::Command(format!("session ttl out of range: {}s", ttl.as_secs()))
        })?;

        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(sid.as_str().to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, sid: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        self.raw(sid)
            .map(|json| SessionRecord::from_json(&json))
            .transpose()
    }
}
