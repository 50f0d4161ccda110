//! Permission resolution contract consumed by the gate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use warden_core::{TenantId, UserId};

use crate::Permission;

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// The authoritative store.
    Store,
    /// A cache entry inside its freshness window.
    Cache,
    /// A last-known-good cache entry served because the store could not be
    /// reached. Stale-tolerant: grants revoked after it was cached may still
    /// be reported as held until the stale window closes.
    StaleCache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub held: bool,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn new(held: bool, source: ResolutionSource) -> Self {
        Self { held, source }
    }

    pub fn from_store(held: bool) -> Self {
        Self::new(held, ResolutionSource::Store)
    }

    pub fn is_stale(&self) -> bool {
        self.source == ResolutionSource::StaleCache
    }
}

/// A lookup that could not produce a definitive answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error("permission store unavailable: {0}")]
    Unavailable(String),

    #[error("permission lookup timed out after {0:?}")]
    TimedOut(Duration),
}

/// Answers "does this user hold this permission in this tenant?".
///
/// A permission is held when it is granted to the user directly in the
/// tenant, or granted to any role the user holds in that tenant. Grants from
/// other tenants never count, and an absent tenant matches nothing.
///
/// Implementations must be safe to call concurrently and must never report
/// `held = true` for a lookup that failed; they return [`ResolverError`]
/// instead, which the gate treats as not held.
#[async_trait]
pub trait PermissionResolver: Send + Sync {
    async fn resolve(
        &self,
        user_id: UserId,
        tenant_id: Option<TenantId>,
        permission: &Permission,
    ) -> Result<Resolution, ResolverError>;

    /// Fail-closed boolean view of [`PermissionResolver::resolve`].
    async fn has_permission(
        &self,
        user_id: UserId,
        tenant_id: Option<TenantId>,
        permission: &Permission,
    ) -> bool {
        matches!(
            self.resolve(user_id, tenant_id, permission).await,
            Ok(Resolution { held: true, .. })
        )
    }
}

#[async_trait]
impl<R> PermissionResolver for Arc<R>
where
    R: PermissionResolver + ?Sized,
{
    async fn resolve(
        &self,
        user_id: UserId,
        tenant_id: Option<TenantId>,
        permission: &Permission,
    ) -> Result<Resolution, ResolverError> {
        (**self).resolve(user_id, tenant_id, permission).await
    }
}
