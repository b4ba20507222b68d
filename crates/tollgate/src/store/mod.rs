//! Shared TTL cache behind every verification record.
//!
//! All cross-request state lives here; nothing is kept in-process. The
//! production backend is Redis, the memory backend serves tests and local
//! development.

mod memory;
mod redis_store;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use tollgate_common::TollgateError;

/// Cache store failures. All of them are fatal for the request.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("write failed: {0}")]
    WriteFailed(String),
}

impl From<StoreError> for TollgateError {
    fn from(err: StoreError) -> Self {
        TollgateError::StoreUnavailable(err.to_string())
    }
}

/// One key/value write with its expiry
#[derive(Debug, Clone, Copy)]
pub struct TtlEntry<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub ttl: Duration,
}

impl<'a> TtlEntry<'a> {
    pub fn new(key: &'a str, value: &'a str, ttl: Duration) -> Self {
        Self { key, value, ttl }
    }
}

/// Key-value store with per-key expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Write `guard` only if its key is absent, and `entry` together with it.
    ///
    /// Both writes land or neither does. Returns `Ok(false)` without writing
    /// anything when `guard.key` already holds a live value.
    async fn set_pair_if_absent(
        &self,
        guard: TtlEntry<'_>,
        entry: TtlEntry<'_>,
    ) -> Result<bool, StoreError>;

    /// Round-trip to the backend (readiness probes)
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Whole seconds for a TTL, never below one (zero would mean "no expiry").
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
