//! In-process cache store for tests and local development.
//!
//! Expiry runs on the tokio clock, so `tokio::time::pause` / `advance`
//! drive it deterministically in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use super::{CacheStore, StoreError, TtlEntry};

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// HashMap-backed cache store with per-key expiry
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    fail_next_pair_write: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `set_pair_if_absent` fail after staging its first write.
    #[cfg(test)]
    pub fn fail_next_pair_write(&self) {
        self.fail_next_pair_write.store(true, Ordering::SeqCst);
    }

    /// Remaining lifetime of a live key
    #[cfg(test)]
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.lock();
        entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.expires_at - now)
    }

    /// Number of live keys
    #[cfg(test)]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|e| e.is_live(now)).count()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A panic while holding the lock cannot leave a half-applied entry.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(e) if e.is_live(now) => Some(e.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

/// Drop every expired entry
fn sweep_expired(entries: &mut HashMap<String, Entry>, now: Instant) {
    entries.retain(|_, e| e.is_live(now));
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.live_value(key))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.live_value(key).is_some())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.lock();
        sweep_expired(&mut entries, Instant::now());
        entries.insert(key.to_string(), Entry::new(value, ttl));
        Ok(())
    }

    async fn set_pair_if_absent(
        &self,
        guard: TtlEntry<'_>,
        entry: TtlEntry<'_>,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut entries = self.lock();
        sweep_expired(&mut entries, now);

        if entries.contains_key(guard.key) {
            return Ok(false);
        }

        // Stage both writes; the map is only touched once both are ready.
        let mut staged = Vec::with_capacity(2);
        staged.push((guard.key.to_string(), Entry::new(guard.value, guard.ttl)));

        if self.fail_next_pair_write.swap(false, Ordering::SeqCst) {
            return Err(StoreError::WriteFailed(format!(
                "injected failure before writing {}",
                entry.key
            )));
        }

        staged.push((entry.key.to_string(), Entry::new(entry.value, entry.ttl)));
        entries.extend(staged);

        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let store = MemoryStore::new();
        store.set_with_ttl("img_a", "X7K9", secs(300)).await.unwrap();

        tokio::time::advance(secs(299)).await;
        assert_eq!(store.get("img_a").await.unwrap().as_deref(), Some("X7K9"));

        tokio::time::advance(secs(1)).await;
        assert_eq!(store.get("img_a").await.unwrap(), None);
        assert!(!store.exists("img_a").await.unwrap());
    }

    #[tokio::test]
    async fn test_pair_write_refused_while_guard_live() {
        let store = MemoryStore::new();
        let first = store
            .set_pair_if_absent(
                TtlEntry::new("sms_flag_1", "1", secs(60)),
                TtlEntry::new("sms_1", "000001", secs(300)),
            )
            .await
            .unwrap();
        assert!(first);

        let second = store
            .set_pair_if_absent(
                TtlEntry::new("sms_flag_1", "1", secs(60)),
                TtlEntry::new("sms_1", "999999", secs(300)),
            )
            .await
            .unwrap();
        assert!(!second);
        assert_eq!(store.get("sms_1").await.unwrap().as_deref(), Some("000001"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pair_write_allowed_once_guard_expires() {
        let store = MemoryStore::new();
        let guard = TtlEntry::new("sms_flag_1", "1", secs(60));

        assert!(store
            .set_pair_if_absent(guard, TtlEntry::new("sms_1", "111111", secs(300)))
            .await
            .unwrap());

        tokio::time::advance(secs(61)).await;

        assert!(store
            .set_pair_if_absent(guard, TtlEntry::new("sms_1", "222222", secs(300)))
            .await
            .unwrap());
        assert_eq!(store.get("sms_1").await.unwrap().as_deref(), Some("222222"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_sweep_expired_entries() {
        let store = MemoryStore::new();
        store.set_with_ttl("img_a", "AAAA", secs(300)).await.unwrap();
        store.set_with_ttl("img_b", "BBBB", secs(300)).await.unwrap();

        tokio::time::advance(secs(301)).await;
        store.set_with_ttl("img_c", "CCCC", secs(300)).await.unwrap();
        assert_eq!(store.entries.lock().unwrap().len(), 1);

        tokio::time::advance(secs(301)).await;
        store
            .set_pair_if_absent(
                TtlEntry::new("sms_flag_1", "1", secs(60)),
                TtlEntry::new("sms_1", "123456", secs(300)),
            )
            .await
            .unwrap();
        let entries = store.entries.lock().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(!entries.contains_key("img_c"));
    }

    #[tokio::test]
    async fn test_injected_failure_leaves_neither_key() {
        let store = MemoryStore::new();
        store.fail_next_pair_write();

        let result = store
            .set_pair_if_absent(
                TtlEntry::new("sms_flag_1", "1", secs(60)),
                TtlEntry::new("sms_1", "123456", secs(300)),
            )
            .await;

        assert!(matches!(result, Err(StoreError::WriteFailed(_))));
        assert!(!store.exists("sms_flag_1").await.unwrap());
        assert!(!store.exists("sms_1").await.unwrap());
        assert!(store.is_empty());
    }
}
