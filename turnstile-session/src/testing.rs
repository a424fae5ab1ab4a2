//! Test doubles for the session store and token generator.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use crate::error::{SessionError, SessionResult, StoreError};
use crate::memory_store::MemorySessionStore;
use crate::record::SessionRecord;
use crate::store::SessionStore;
use crate::token::{SessionId, TokenGenerator};

/// A store operation observed by [`InstrumentedStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Exists(String),
    SetWithTtl { sid: String, ttl: Duration },
    Get(String),
}

/// In-memory store that records every call and can be told to fail.
#[derive(Default)]
pub struct InstrumentedStore {
    inner: MemorySessionStore,
    calls: Mutex<Vec<StoreCall>>,
    read_error: Mutex<Option<StoreError>>,
    write_error: Mutex<Option<StoreError>>,
}

impl InstrumentedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `exists` and `get` fail with `error`.
    pub fn fail_reads(self, error: StoreError) -> Self {
        *self.read_error.lock() = Some(error);
        self
    }

    /// Make `set_with_ttl` fail with `error`.
    pub fn fail_writes(self, error: StoreError) -> Self {
        *self.write_error.lock() = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The backing store, for seeding and inspecting entries.
    pub fn inner(&self) -> &MemorySessionStore {
        &self.inner
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().push(call);
    }

    fn injected(slot: &Mutex<Option<StoreError>>) -> Result<(), StoreError> {
        match slot.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SessionStore for InstrumentedStore {
    async fn exists(&self, sid: &SessionId) -> Result<bool, StoreError> {
        self.record(StoreCall::Exists(sid.to_string()));
        Self::injected(&self.read_error)?;
        self.inner.exists(sid).await
    }

    async fn set_with_ttl(
        &self,
        sid: &SessionId,
        record: &SessionRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.record(StoreCall::SetWithTtl {
            sid: sid.to_string(),
            ttl,
        });
        Self::injected(&self.write_error)?;
        self.inner.set_with_ttl(sid, record, ttl).await
    }

    async fn get(&self, sid: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        self.record(StoreCall::Get(sid.to_string()));
        Self::injected(&self.read_error)?;
        self.inner.get(sid).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Self::injected(&self.read_error)
    }
}

/// Generator whose entropy source is always unavailable.
#[derive(Debug, Default)]
pub struct FailingTokenGenerator;

impl TokenGenerator for FailingTokenGenerator {
    fn generate(&self) -> SessionResult<SessionId> {
        Err(SessionError::TokenGeneration(
            "entropy source unavailable".to_string(),
        ))
    }
}
