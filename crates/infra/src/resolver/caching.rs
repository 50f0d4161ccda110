//! Cache-fronted resolver with bounded retries and stale-on-error fallback.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use warden_auth::{Permission, PermissionResolver, Resolution, ResolutionSource, ResolverError};
use warden_core::{TenantId, UserId};

use crate::cache::{CacheKey, CachedPermission, PermissionCache};

/// Timing knobs for [`CachingPermissionResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverPolicy {
    /// Entries younger than this are answered without touching the store.
    pub fresh_ttl: Duration,
    /// Entries younger than this may be served when the store is failing.
    pub stale_ttl: Duration,
    /// Upper bound for one store lookup.
    pub lookup_timeout: Duration,
    /// Store lookups per resolution, including the first. Zero acts as one.
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            fresh_ttl: Duration::from_secs(30),
            stale_ttl: Duration::from_secs(300),
            lookup_timeout: Duration::from_millis(250),
            max_attempts: 2,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

/// Wraps an authoritative resolver with a [`PermissionCache`].
///
/// Answers served past `fresh_ttl` because the store is down are marked
/// [`ResolutionSource::StaleCache`]; a revocation made during the outage is
/// therefore not observed until the store answers again or the entry ages
/// past `stale_ttl`. Without a usable entry the failure surfaces as
/// [`ResolverError::Unavailable`] and the gate denies.
#[derive(Debug)]
pub struct CachingPermissionResolver<R, C> {
    inner: R,
    cache: C,
    policy: ResolverPolicy,
}

impl<R, C> CachingPermissionResolver<R, C> {
    pub fn new(inner: R, cache: C, policy: ResolverPolicy) -> Self {
        Self {
            inner,
            cache,
            policy,
        }
    }

    pub fn policy(&self) -> &ResolverPolicy {
        &self.policy
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<R, C> CachingPermissionResolver<R, C>
where
    R: PermissionResolver,
    C: PermissionCache,
{
    async fn lookup_with_retry(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        permission: &Permission,
    ) -> Result<Resolution, ResolverError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = ResolverError::Unavailable("no lookup attempted".to_string());

        for attempt in 1..=attempts {
            let lookup = self.inner.resolve(user_id, Some(tenant_id), permission);
            match tokio::time::timeout(self.policy.lookup_timeout, lookup).await {
                Ok(Ok(resolution)) => return Ok(resolution),
                Ok(Err(err)) => last_error = err,
                Err(_) => last_error = ResolverError::TimedOut(self.policy.lookup_timeout),
            }

            debug!(
                attempt,
                attempts,
                permission = %permission,
                error = %last_error,
                "permission lookup failed"
            );
            if attempt < attempts {
                tokio::time::sleep(self.policy.retry_backoff).await;
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl<R, C> PermissionResolver for CachingPermissionResolver<R, C>
where
    R: PermissionResolver,
    C: PermissionCache,
{
    async fn resolve(
        &self,
        user_id: UserId,
        tenant_id: Option<TenantId>,
        permission: &Permission,
    ) -> Result<Resolution, ResolverError> {
        let Some(tenant_id) = tenant_id else {
            return Ok(Resolution::from_store(false));
        };
        let key = CacheKey::new(tenant_id, user_id, permission.clone());

        let cached = match self.cache.get(&key).await {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "permission cache read failed; treating as miss");
                None
            }
        };

        if let Some(entry) = cached {
            if entry.age(Utc::now()) <= self.policy.fresh_ttl {
                return Ok(Resolution::new(entry.held, ResolutionSource::Cache));
            }
        }

        // Read before the lookup: an invalidation racing the lookup must win.
        let generation = match self.cache.generation(tenant_id, user_id).await {
            Ok(generation) => Some(generation),
            Err(err) => {
                warn!(error = %err, "permission cache generation read failed; answer will not be cached");
                None
            }
        };

        match self.lookup_with_retry(user_id, tenant_id, permission).await {
            Ok(resolution) => {
                if let Some(generation) = generation {
                    let entry = CachedPermission::new(resolution.held, Utc::now());
                    match self.cache.put(key, entry, generation).await {
                        Ok(true) => {}
                        Ok(false) => debug!(
                            user_id = %user_id,
                            tenant_id = %tenant_id,
                            permission = %permission,
                            "permissions invalidated during lookup; answer not cached"
                        ),
                        Err(err) => warn!(error = %err, "permission cache write failed"),
                    }
                }
                Ok(resolution)
            }
            Err(err) => match cached {
                Some(entry) if entry.age(Utc::now()) <= self.policy.stale_ttl => {
                    warn!(
                        user_id = %user_id,
                        tenant_id = %tenant_id,
                        permission = %permission,
                        error = %err,
                        held = entry.held,
                        "serving stale permission answer"
                    );
                    Ok(Resolution::new(entry.held, ResolutionSource::StaleCache))
                }
                _ => match err {
                    ResolverError::Unavailable(_) => Err(err),
                    other => Err(ResolverError::Unavailable(other.to_string())),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use tokio::sync::Notify;

    use crate::cache::{CacheError, InMemoryPermissionCache};

    /// Answers `held` unless switched off; counts calls.
    #[derive(Default)]
    struct Store {
        down: AtomicBool,
        slow: AtomicBool,
        held: AtomicBool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PermissionResolver for Store {
        async fn resolve(
            &self,
            _user_id: UserId,
            _tenant_id: Option<TenantId>,
            _permission: &Permission,
        ) -> Result<Resolution, ResolverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.slow.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if self.down.load(Ordering::SeqCst) {
                return Err(ResolverError::Unavailable("connection refused".to_string()));
            }
            Ok(Resolution::from_store(self.held.load(Ordering::SeqCst)))
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl PermissionCache for BrokenCache {
        async fn get(&self, _key: &CacheKey) -> Result<Option<CachedPermission>, CacheError> {
            Err(CacheError::Backend("down".to_string()))
        }

        async fn generation(&self, _t: TenantId, _u: UserId) -> Result<u64, CacheError> {
            Err(CacheError::Backend("down".to_string()))
        }

        async fn put(
            &self,
            _key: CacheKey,
            _entry: CachedPermission,
            _generation: u64,
        ) -> Result<bool, CacheError> {
            Err(CacheError::Backend("down".to_string()))
        }

        async fn invalidate_user(&self, _t: TenantId, _u: UserId) -> Result<(), CacheError> {
            Err(CacheError::Backend("down".to_string()))
        }

        async fn invalidate_tenant(&self, _t: TenantId) -> Result<(), CacheError> {
            Err(CacheError::Backend("down".to_string()))
        }
    }

    fn policy() -> ResolverPolicy {
        ResolverPolicy {
            fresh_ttl: Duration::from_secs(30),
            stale_ttl: Duration::from_secs(300),
            lookup_timeout: Duration::from_millis(50),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(1),
        }
    }

    fn perm() -> Permission {
        Permission::new("reports.read")
    }

    async fn seed(cache: &InMemoryPermissionCache, tenant: TenantId, user: UserId, entry: CachedPermission) {
        let generation = cache.generation(tenant, user).await.unwrap();
        assert!(cache.put(CacheKey::new(tenant, user, perm()), entry, generation).await.unwrap());
    }

    /// Reads the grant, then holds the answer until released.
    struct HeldBackLookup {
        held: AtomicBool,
        read: Notify,
        release: Notify,
    }

    #[async_trait]
    impl PermissionResolver for HeldBackLookup {
        async fn resolve(
            &self,
            _user_id: UserId,
            _tenant_id: Option<TenantId>,
            _permission: &Permission,
        ) -> Result<Resolution, ResolverError> {
            let held = self.held.load(Ordering::SeqCst);
            self.read.notify_one();
            self.release.notified().await;
            Ok(Resolution::from_store(held))
        }
    }

    #[tokio::test]
    async fn fresh_entries_skip_the_store() {
        let store = Arc::new(Store::default());
        store.held.store(true, Ordering::SeqCst);
        let resolver =
            CachingPermissionResolver::new(store.clone(), InMemoryPermissionCache::new(), policy());
        let (user, tenant) = (UserId::new(), TenantId::new());

        let first = resolver.resolve(user, Some(tenant), &perm()).await.unwrap();
        let second = resolver.resolve(user, Some(tenant), &perm()).await.unwrap();

        assert_eq!(first, Resolution::from_store(true));
        assert_eq!(second, Resolution::new(true, ResolutionSource::Cache));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_refreshed() {
        let store = Arc::new(Store::default());
        let cache = Arc::new(InMemoryPermissionCache::new());
        let resolver = CachingPermissionResolver::new(store.clone(), cache.clone(), policy());
        let (user, tenant) = (UserId::new(), TenantId::new());

        let old = Utc::now() - chrono::Duration::seconds(60);
        seed(&cache, tenant, user, CachedPermission::new(true, old)).await;

        let resolution = resolver.resolve(user, Some(tenant), &perm()).await.unwrap();
        assert_eq!(resolution, Resolution::from_store(false));
    }

    #[tokio::test]
    async fn store_outage_serves_stale_entry() {
        let store = Arc::new(Store::default());
        store.down.store(true, Ordering::SeqCst);
        let cache = Arc::new(InMemoryPermissionCache::new());
        let resolver = CachingPermissionResolver::new(store.clone(), cache.clone(), policy());
        let (user, tenant) = (UserId::new(), TenantId::new());

        let old = Utc::now() - chrono::Duration::seconds(60);
        seed(&cache, tenant, user, CachedPermission::new(true, old)).await;

        let resolution = resolver.resolve(user, Some(tenant), &perm()).await.unwrap();
        assert!(resolution.is_stale());
        assert!(resolution.held);
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn store_outage_without_entry_is_unavailable() {
        let store = Arc::new(Store::default());
        store.down.store(true, Ordering::SeqCst);
        let resolver =
            CachingPermissionResolver::new(store.clone(), InMemoryPermissionCache::new(), policy());

        let err = resolver
            .resolve(UserId::new(), Some(TenantId::new()), &perm())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::Unavailable(_)));
        assert!(!resolver.has_permission(UserId::new(), Some(TenantId::new()), &perm()).await);
    }

    #[tokio::test]
    async fn entries_past_the_stale_window_are_not_served() {
        let store = Arc::new(Store::default());
        store.down.store(true, Ordering::SeqCst);
        let cache = Arc::new(InMemoryPermissionCache::new());
        let resolver = CachingPermissionResolver::new(store.clone(), cache.clone(), policy());
        let (user, tenant) = (UserId::new(), TenantId::new());

        let ancient = Utc::now() - chrono::Duration::seconds(600);
        seed(&cache, tenant, user, CachedPermission::new(true, ancient)).await;

        assert!(resolver.resolve(user, Some(tenant), &perm()).await.is_err());
    }

    #[tokio::test]
    async fn slow_lookups_time_out_per_attempt() {
        let store = Arc::new(Store::default());
        store.slow.store(true, Ordering::SeqCst);
        let resolver =
            CachingPermissionResolver::new(store.clone(), InMemoryPermissionCache::new(), policy());

        let started = std::time::Instant::now();
        let err = resolver
            .resolve(UserId::new(), Some(TenantId::new()), &perm())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn broken_cache_degrades_to_store_lookups() {
        let store = Arc::new(Store::default());
        store.held.store(true, Ordering::SeqCst);
        let resolver = CachingPermissionResolver::new(store.clone(), BrokenCache, policy());

        let resolution = resolver
            .resolve(UserId::new(), Some(TenantId::new()), &perm())
            .await
            .unwrap();
        assert_eq!(resolution, Resolution::from_store(true));
    }

    #[tokio::test]
    async fn lookup_racing_an_invalidation_is_not_cached() {
        let lookup = Arc::new(HeldBackLookup {
            held: AtomicBool::new(true),
            read: Notify::new(),
            release: Notify::new(),
        });
        let cache = Arc::new(InMemoryPermissionCache::new());
        let resolver = Arc::new(CachingPermissionResolver::new(
            lookup.clone(),
            cache.clone(),
            ResolverPolicy {
                lookup_timeout: Duration::from_secs(5),
                ..policy()
            },
        ));
        let (user, tenant) = (UserId::new(), TenantId::new());

        let in_flight = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.resolve(user, Some(tenant), &perm()).await }
        });
        lookup.read.notified().await;

        // Revocation lands and is invalidated while the old answer is in flight.
        lookup.held.store(false, Ordering::SeqCst);
        cache.invalidate_user(tenant, user).await.unwrap();
        lookup.release.notify_one();

        let before = in_flight.await.unwrap().unwrap();
        assert_eq!(before, Resolution::from_store(true));
        assert!(cache.is_empty());

        let after = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.resolve(user, Some(tenant), &perm()).await }
        });
        lookup.read.notified().await;
        lookup.release.notify_one();
        let after = after.await.unwrap().unwrap();

        assert!(!after.held);
        assert_eq!(after.source, ResolutionSource::Store);
    }

    #[tokio::test]
    async fn absent_tenant_is_not_held_and_not_cached() {
        let store = Arc::new(Store::default());
        store.held.store(true, Ordering::SeqCst);
        let cache = Arc::new(InMemoryPermissionCache::new());
        let resolver = CachingPermissionResolver::new(store.clone(), cache.clone(), policy());

        let resolution = resolver.resolve(UserId::new(), None, &perm()).await.unwrap();
        assert!(!resolution.held);
        assert!(cache.is_empty());
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }
}
