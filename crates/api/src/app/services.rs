//! Infrastructure wiring: store, bus, resolver chain, dispatcher, workers.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use warden_auth::{AuthorizationGate, RegistryError};
use warden_directory::{DirectoryEvent, operation_registry};
use warden_events::{EventEnvelope, InMemoryEventBus};
use warden_infra::{
    BootstrapReport, CacheError, CacheInvalidationWorker, CachingPermissionResolver, DirectoryService, DispatchError,
    InMemoryDirectoryStore, InMemoryPermissionCache, OperationDispatcher, PermissionCache,
    StoreBackedResolver, WorkerError, WorkerHandle,
};

use crate::config::AppConfig;

pub type Bus = Arc<InMemoryEventBus<EventEnvelope<DirectoryEvent>>>;
pub type Cache = Arc<dyn PermissionCache>;
pub type Resolver = CachingPermissionResolver<StoreBackedResolver<InMemoryDirectoryStore>, Cache>;
pub type Handler = DirectoryService<InMemoryDirectoryStore, Bus>;
pub type Dispatcher = OperationDispatcher<Resolver, Handler>;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("operation registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("permission cache: {0}")]
    Cache(#[from] CacheError),

    #[error("cache invalidation worker: {0}")]
    Worker(#[from] WorkerError),

    #[error("bootstrap tenant: {0}")]
    Bootstrap(#[from] DispatchError),
}

pub struct AppServices {
    pub dispatcher: Dispatcher,
    pub expose_unmet_requirement: bool,
    /// Tenant and admin created at startup, when configured.
    pub bootstrap: Option<BootstrapReport>,
    invalidation: Mutex<Option<WorkerHandle>>,
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices")
            .field("expose_unmet_requirement", &self.expose_unmet_requirement)
            .field("bootstrap", &self.bootstrap)
            .finish_non_exhaustive()
    }
}

impl AppServices {
    /// Stop background workers. Blocks until they have exited.
    pub fn shutdown(&self) {
        let handle = self.invalidation.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            handle.shutdown();
        }
    }
}

#[cfg(feature = "redis")]
fn shared_cache(config: &AppConfig) -> Result<Option<Cache>, StartupError> {
    let Some(url) = &config.redis_url else {
        return Ok(None);
    };
    let cache = warden_infra::RedisPermissionCache::new(
        url,
        "warden:perm",
        config.resolver_policy.stale_ttl,
    )?;
    tracing::info!("using redis permission cache");
    Ok(Some(Arc::new(cache)))
}

#[cfg(not(feature = "redis"))]
fn shared_cache(config: &AppConfig) -> Result<Option<Cache>, StartupError> {
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL set but the redis feature is disabled; using in-memory cache");
    }
    Ok(None)
}

fn build_cache(config: &AppConfig) -> Result<Cache, StartupError> {
    match shared_cache(config)? {
        Some(cache) => Ok(cache),
        None => Ok(Arc::new(InMemoryPermissionCache::new())),
    }
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let store = Arc::new(InMemoryDirectoryStore::new());
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let cache = build_cache(config)?;

    let resolver = CachingPermissionResolver::new(
        StoreBackedResolver::new(store.clone()),
        cache.clone(),
        config.resolver_policy,
    );
    let registry = Arc::new(operation_registry()?);
    let gate = AuthorizationGate::new(registry, resolver);
    let service = DirectoryService::new(store, bus.clone());

    let mut bootstrap = None;
    if let Some(slug) = &config.bootstrap_tenant {
        let report = service
            .bootstrap_tenant(slug, slug, &config.bootstrap_admin_email)
            .await?;
        tracing::info!(
            tenant_id = %report.tenant.id,
            admin_user_id = %report.admin.id,
            admin_email = %report.admin.email,
            "bootstrap tenant ready"
        );
        bootstrap = Some(report);
    }

    let worker = CacheInvalidationWorker::spawn("cache-invalidation", &bus, cache)?;

    Ok(AppServices {
        dispatcher: OperationDispatcher::new(gate, service),
        expose_unmet_requirement: config.expose_unmet_requirement,
        bootstrap,
        invalidation: Mutex::new(Some(worker)),
    })
}
