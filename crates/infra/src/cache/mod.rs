//! Permission answer cache used by [`crate::resolver::CachingPermissionResolver`].
//!
//! The cache only stores answers; freshness is judged by the resolver from
//! `cached_at`, so an entry can be served fresh, served stale during a store
//! outage, or ignored.
//!
//! Every `(tenant, user)` pair has a generation that any invalidation
//! touching the pair advances. Writers read it before asking the store and
//! hand it back to [`PermissionCache::put`], which refuses the write if the
//! pair was invalidated in between. An answer read before a revocation can
//! therefore never land in the cache after the revocation was invalidated.

mod in_memory;
#[cfg(feature = "redis")]
mod redis_cache;

pub use in_memory::InMemoryPermissionCache;
#[cfg(feature = "redis")]
pub use redis_cache::RedisPermissionCache;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_auth::Permission;
use warden_core::{TenantId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub permission: Permission,
}

impl CacheKey {
    pub fn new(tenant_id: TenantId, user_id: UserId, permission: Permission) -> Self {
        Self {
            tenant_id,
            user_id,
            permission,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPermission {
    pub held: bool,
    pub cached_at: DateTime<Utc>,
}

impl CachedPermission {
    pub fn new(held: bool, cached_at: DateTime<Utc>) -> Self {
        Self { held, cached_at }
    }

    /// Time since the answer was cached. Clock skew never yields a negative age.
    pub fn age(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.cached_at).to_std().unwrap_or_default()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache entry could not be decoded: {0}")]
    Codec(String),
}

#[async_trait]
pub trait PermissionCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedPermission>, CacheError>;

    /// Current invalidation generation of `(tenant_id, user_id)`.
    async fn generation(&self, tenant_id: TenantId, user_id: UserId) -> Result<u64, CacheError>;

    /// Store `entry` unless the key's pair has moved past `generation`.
    /// Returns whether the entry was stored.
    async fn put(
        &self,
        key: CacheKey,
        entry: CachedPermission,
        generation: u64,
    ) -> Result<bool, CacheError>;

    /// Drop every entry for one user in one tenant.
    async fn invalidate_user(&self, tenant_id: TenantId, user_id: UserId) -> Result<(), CacheError>;

    /// Drop every entry in one tenant.
    async fn invalidate_tenant(&self, tenant_id: TenantId) -> Result<(), CacheError>;
}

#[async_trait]
impl<C> PermissionCache for Arc<C>
where
    C: PermissionCache + ?Sized,
{
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedPermission>, CacheError> {
        (**self).get(key).await
    }

    async fn generation(&self, tenant_id: TenantId, user_id: UserId) -> Result<u64, CacheError> {
        (**self).generation(tenant_id, user_id).await
    }

    async fn put(
        &self,
        key: CacheKey,
        entry: CachedPermission,
        generation: u64,
    ) -> Result<bool, CacheError> {
        (**self).put(key, entry, generation).await
    }

    async fn invalidate_user(&self, tenant_id: TenantId, user_id: UserId) -> Result<(), CacheError> {
        (**self).invalidate_user(tenant_id, user_id).await
    }

    async fn invalidate_tenant(&self, tenant_id: TenantId) -> Result<(), CacheError> {
        (**self).invalidate_tenant(tenant_id).await
    }
}
