use std::sync::Arc;

use async_trait::async_trait;

use warden_auth::{Permission, PermissionResolver, Resolution, ResolverError};
use warden_core::{TenantId, UserId};
use warden_directory::UserStatus;

use crate::store::{DirectoryStore, StoreError};

/// Resolves permissions straight from the directory store.
///
/// A permission is held when the tenant defines it and it is granted to the
/// user directly or to any role the user is a member of, all inside the same
/// tenant. Unknown and suspended users hold nothing.
#[derive(Debug)]
pub struct StoreBackedResolver<S> {
    store: Arc<S>,
}

impl<S> StoreBackedResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> Clone for StoreBackedResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

fn unavailable(err: StoreError) -> ResolverError {
    ResolverError::Unavailable(err.to_string())
}

impl<S: DirectoryStore> StoreBackedResolver<S> {
    async fn held(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        permission: &Permission,
    ) -> Result<bool, StoreError> {
        let Some(user) = self.store.get_user(tenant_id, user_id).await? else {
            return Ok(false);
        };
        if user.status == UserStatus::Suspended {
            return Ok(false);
        }

        let Some(definition) = self.store.permission_by_name(tenant_id, permission).await? else {
            return Ok(false);
        };

        let direct = self
            .store
            .direct_permissions_of_user(tenant_id, user_id)
            .await?;
        if direct.contains(&definition.id) {
            return Ok(true);
        }

        for role_id in self.store.roles_of_user(tenant_id, user_id).await? {
            let granted = self.store.permissions_of_role(tenant_id, role_id).await?;
            if granted.contains(&definition.id) {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[async_trait]
impl<S: DirectoryStore> PermissionResolver for StoreBackedResolver<S> {
    async fn resolve(
        &self,
        user_id: UserId,
        tenant_id: Option<TenantId>,
        permission: &Permission,
    ) -> Result<Resolution, ResolverError> {
        let Some(tenant_id) = tenant_id else {
            return Ok(Resolution::from_store(false));
        };

        let held = self
            .held(user_id, tenant_id, permission)
            .await
            .map_err(unavailable)?;
        Ok(Resolution::from_store(held))
    }
}
