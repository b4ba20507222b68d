//! Redis-backed cache store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

use super::{CacheStore, StoreError, TtlEntry, ttl_secs};

/// Guard SET NX and the paired SET run inside one script, which Redis
/// executes atomically and replicates as a unit.
const SET_PAIR_IF_ABSENT: &str = r#"
if redis.call('SET', KEYS[1], ARGV[1], 'NX', 'EX', ARGV[2]) then
    redis.call('SET', KEYS[2], ARGV[3], 'EX', ARGV[4])
    return 1
end
return 0
"#;

/// Cache store over a Redis connection manager (auto-reconnecting)
pub struct RedisStore {
    conn: ConnectionManager,
    pair_script: redis::Script,
}

impl RedisStore {
    /// Connect to Redis
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client =
            redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self {
            conn,
            pair_script: redis::Script::new(SET_PAIR_IF_ABSENT),
        })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn set_pair_if_absent(
        &self,
        guard: TtlEntry<'_>,
        entry: TtlEntry<'_>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let applied: i64 = self
            .pair_script
            .key(guard.key)
            .key(entry.key)
            .arg(guard.value)
            .arg(ttl_secs(guard.ttl))
            .arg(entry.value)
            .arg(ttl_secs(entry.ttl))
            .invoke_async(&mut conn)
            .await?;

        Ok(applied == 1)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
