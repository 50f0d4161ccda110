//! Redis-backed permission cache, shared by every node of a deployment.
//!
//! Keys are `{prefix}:{tenant}:{user}:{permission}` holding a JSON
//! [`CachedPermission`]. Entries expire after `entry_ttl`, which should be at
//! least the resolver's stale window. Generations are counters under
//! `{prefix}:gen:{tenant}` and `{prefix}:gen:{tenant}:{user}`; invalidation
//! increments them before deleting entries, and writes compare them inside a
//! script so the check and the `SET` are atomic.

use std::time::Duration;

use async_trait::async_trait;

use warden_core::{TenantId, UserId};

use super::{CacheError, CacheKey, CachedPermission, PermissionCache};

/// KEYS: tenant generation, user generation, entry. ARGV: expected
/// generation, payload, ttl seconds.
const PUT_IF_CURRENT: &str = r"
local current = tonumber(redis.call('GET', KEYS[1]) or '0') + tonumber(redis.call('GET', KEYS[2]) or '0')
if current ~= tonumber(ARGV[1]) then
  return 0
end
redis.call('SET', KEYS[3], ARGV[2], 'EX', ARGV[3])
return 1
";

#[derive(Debug, Clone)]
pub struct RedisPermissionCache {
    client: redis::Client,
    prefix: String,
    entry_ttl: Duration,
}

impl RedisPermissionCache {
    pub fn new(
        redis_url: impl AsRef<str>,
        prefix: impl Into<String>,
        entry_ttl: Duration,
    ) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url.as_ref()).map_err(backend)?;
        Ok(Self {
            client,
            prefix: prefix.into(),
            entry_ttl,
        })
    }

    fn key(&self, key: &CacheKey) -> String {
        format!(
            "{}:{}:{}:{}",
            self.prefix, key.tenant_id, key.user_id, key.permission
        )
    }

    fn tenant_generation_key(&self, tenant_id: TenantId) -> String {
        format!("{}:gen:{}", self.prefix, tenant_id)
    }

    fn user_generation_key(&self, tenant_id: TenantId, user_id: UserId) -> String {
        format!("{}:gen:{}:{}", self.prefix, tenant_id, user_id)
    }

    async fn bump(&self, generation_key: String) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: u64 = redis::cmd("INCR")
            .arg(generation_key)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend)
    }

    async fn delete_matching(&self, pattern: String) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        // KEYS is O(n) over the keyspace; acceptable for a dedicated cache db.
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(&pattern)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        if keys.is_empty() {
            return Ok(());
        }

        let removed: i64 = redis::cmd("DEL")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        tracing::debug!(pattern = %pattern, removed, "permission cache entries invalidated");
        Ok(())
    }
}

fn backend(err: redis::RedisError) -> CacheError {
    CacheError::Backend(err.to_string())
}

#[async_trait]
impl PermissionCache for RedisPermissionCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedPermission>, CacheError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        raw.map(|payload| {
            serde_json::from_str(&payload).map_err(|e| CacheError::Codec(e.to_string()))
        })
        .transpose()
    }

    async fn generation(&self, tenant_id: TenantId, user_id: UserId) -> Result<u64, CacheError> {
        let mut conn = self.connection().await?;
        let counters: Vec<Option<u64>> = redis::cmd("MGET")
            .arg(self.tenant_generation_key(tenant_id))
            .arg(self.user_generation_key(tenant_id, user_id))
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(counters.into_iter().flatten().sum())
    }

    async fn put(
        &self,
        key: CacheKey,
        entry: CachedPermission,
        generation: u64,
    ) -> Result<bool, CacheError> {
        let payload =
            serde_json::to_string(&entry).map_err(|e| CacheError::Codec(e.to_string()))?;
        let mut conn = self.connection().await?;
        let stored: i64 = redis::Script::new(PUT_IF_CURRENT)
            .key(self.tenant_generation_key(key.tenant_id))
            .key(self.user_generation_key(key.tenant_id, key.user_id))
            .key(self.key(&key))
            .arg(generation)
            .arg(payload)
            .arg(self.entry_ttl.as_secs().max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(stored == 1)
    }

    async fn invalidate_user(&self, tenant_id: TenantId, user_id: UserId) -> Result<(), CacheError> {
        self.bump(self.user_generation_key(tenant_id, user_id)).await?;
        self.delete_matching(format!("{}:{}:{}:*", self.prefix, tenant_id, user_id))
            .await
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> Result<(), CacheError> {
        self.bump(self.tenant_generation_key(tenant_id)).await?;
        self.delete_matching(format!("{}:{}:*", self.prefix, tenant_id))
            .await
    }
}
