use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use warden_directory::{DirectoryEvent, InvalidationScope};
use warden_events::{EventBus, EventEnvelope, Subscription};

use crate::cache::PermissionCache;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("cache invalidation worker must be started inside a tokio runtime")]
    NoRuntime,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Drops permission cache entries that a directory change made wrong.
///
/// User-level changes (status, memberships, direct grants) invalidate that
/// user's entries in the tenant; role and permission definition changes
/// invalidate the whole tenant. Delivery is at-least-once and invalidation is
/// idempotent, so redelivered events are harmless.
#[derive(Debug)]
pub struct CacheInvalidationWorker;

impl CacheInvalidationWorker {
    /// Subscribe to `bus` and spawn the worker thread.
    ///
    /// Cache calls are driven on the runtime that is current when this is
    /// called.
    pub fn spawn<B, C>(name: &'static str, bus: &B, cache: C) -> Result<WorkerHandle, WorkerError>
    where
        B: EventBus<EventEnvelope<DirectoryEvent>>,
        C: PermissionCache + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WorkerError::NoRuntime)?;
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub = bus.subscribe();

        let join = thread::Builder::new().name(name.to_string()).spawn(move || {
            worker_loop(name, sub, shutdown_rx, |scope| {
                runtime.block_on(invalidate(&cache, scope))
            })
        })?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

async fn invalidate<C: PermissionCache>(
    cache: &C,
    scope: InvalidationScope,
) -> Result<(), crate::cache::CacheError> {
    match scope {
        InvalidationScope::Nothing => Ok(()),
        InvalidationScope::User { tenant_id, user_id } => {
            cache.invalidate_user(tenant_id, user_id).await
        }
        InvalidationScope::Tenant(tenant_id) => cache.invalidate_tenant(tenant_id).await,
    }
}

fn worker_loop<H, E>(
    name: &'static str,
    sub: Subscription<EventEnvelope<DirectoryEvent>>,
    shutdown_rx: mpsc::Receiver<()>,
    mut handler: H,
) where
    H: FnMut(InvalidationScope) -> Result<(), E>,
    E: core::fmt::Display,
{
    let tick = Duration::from_millis(250);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(envelope) => {
                let scope = envelope.payload().invalidation_scope();
                if scope == InvalidationScope::Nothing {
                    continue;
                }

                debug!(worker = name, event_type = envelope.event_type(), ?scope, "invalidating permission cache");
                if let Err(err) = handler(scope) {
                    warn!(worker = name, error = %err, ?scope, "permission cache invalidation failed");
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use warden_auth::Permission;
    use warden_core::{RoleId, TenantId, UserId};
    use warden_events::InMemoryEventBus;

    use crate::cache::{CacheKey, CachedPermission, InMemoryPermissionCache};

    async fn wait_for(cache: &InMemoryPermissionCache, len: usize) {
        for _ in 0..100 {
            if cache.len() == len {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("cache never reached {len} entries (has {})", cache.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn user_and_tenant_events_invalidate_their_scope() {
        let bus = Arc::new(InMemoryEventBus::<EventEnvelope<DirectoryEvent>>::new());
        let cache = Arc::new(InMemoryPermissionCache::new());
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();
        let alice = UserId::new();
        let bob = UserId::new();

        for (t, u) in [(tenant_a, alice), (tenant_a, bob), (tenant_b, alice)] {
            let generation = cache.generation(t, u).await.unwrap();
            cache
                .put(
                    CacheKey::new(t, u, Permission::new("users.read")),
                    CachedPermission::new(true, Utc::now()),
                    generation,
                )
                .await
                .unwrap();
        }

        let handle = CacheInvalidationWorker::spawn("cache-invalidation", &bus, cache.clone()).unwrap();

        let revoked = DirectoryEvent::RoleRevoked {
            tenant_id: tenant_a,
            user_id: alice,
            role_id: RoleId::new(),
            at: Utc::now(),
        };
        bus.publish(EventEnvelope::wrap(tenant_a, revoked)).unwrap();
        wait_for(&cache, 2).await;

        let role_deleted = DirectoryEvent::RoleDeleted {
            tenant_id: tenant_b,
            role_id: RoleId::new(),
            at: Utc::now(),
        };
        bus.publish(EventEnvelope::wrap(tenant_b, role_deleted)).unwrap();
        wait_for(&cache, 1).await;

        tokio::task::spawn_blocking(move || handle.shutdown()).await.unwrap();
    }

    #[test]
    fn spawning_outside_a_runtime_fails() {
        let bus = InMemoryEventBus::<EventEnvelope<DirectoryEvent>>::new();
        let err = CacheInvalidationWorker::spawn("x", &bus, InMemoryPermissionCache::new()).unwrap_err();
        assert!(matches!(err, WorkerError::NoRuntime));
    }
}
