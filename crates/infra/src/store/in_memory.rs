use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use warden_auth::{Permission, Role};
use warden_core::{PermissionId, RoleId, TenantId, UserId};
use warden_directory::{
    PermissionDefinition, RoleDefinition, RolePermissionGrant, Tenant, User,
    UserPermissionGrant, UserRoleMembership,
};

use super::{DirectoryStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct State {
    tenants: HashMap<TenantId, Tenant>,
    users: HashMap<(TenantId, UserId), User>,
    roles: HashMap<(TenantId, RoleId), RoleDefinition>,
    permissions: HashMap<(TenantId, PermissionId), PermissionDefinition>,
    memberships: HashMap<(TenantId, UserId, RoleId), UserRoleMembership>,
    role_grants: HashMap<(TenantId, RoleId, PermissionId), RolePermissionGrant>,
    user_grants: HashMap<(TenantId, UserId, PermissionId), UserPermissionGrant>,
}

/// In-memory directory store for tests/dev and single-node deployments.
///
/// All tables sit behind one lock so cascading deletes are atomic.
#[derive(Debug, Default)]
pub struct InMemoryDirectoryStore {
    inner: RwLock<State>,
}

impl InMemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("directory lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("directory lock poisoned".to_string()))
    }
}

fn sorted_by<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(key);
    items
}

#[async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    async fn insert_tenant(&self, tenant: Tenant) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.tenants.values().any(|t| t.slug == tenant.slug) {
            return Err(StoreError::Conflict(format!(
                "tenant slug '{}' already exists",
                tenant.slug
            )));
        }
        state.tenants.insert(tenant.id, tenant);
        Ok(())
    }

    async fn get_tenant(&self, tenant_id: TenantId) -> StoreResult<Option<Tenant>> {
        Ok(self.read()?.tenants.get(&tenant_id).cloned())
    }

    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>> {
        let tenants = self.read()?.tenants.values().cloned().collect();
        Ok(sorted_by(tenants, |t: &Tenant| t.slug.clone()))
    }

    async fn insert_user(&self, user: User) -> StoreResult<()> {
        let mut state = self.write()?;
        if state
            .users
            .values()
            .any(|u| u.tenant_id == user.tenant_id && u.email == user.email)
        {
            return Err(StoreError::Conflict(format!(
                "user with email '{}' already exists",
                user.email
            )));
        }
        state.users.insert((user.tenant_id, user.id), user);
        Ok(())
    }

    async fn get_user(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&(tenant_id, user_id)).cloned())
    }

    async fn list_users(&self, tenant_id: TenantId) -> StoreResult<Vec<User>> {
        let users = self
            .read()?
            .users
            .values()
            .filter(|u| u.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(sorted_by(users, |u: &User| u.email.clone()))
    }

    async fn update_user(&self, user: User) -> StoreResult<()> {
        let mut state = self.write()?;
        match state.users.get_mut(&(user.tenant_id, user.id)) {
            Some(existing) => {
                *existing = user;
                Ok(())
            }
            None => Err(StoreError::Conflict(format!("user {} no longer exists", user.id))),
        }
    }

    async fn delete_user(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<bool> {
        let mut state = self.write()?;
        let removed = state.users.remove(&(tenant_id, user_id)).is_some();
        if removed {
            state
                .memberships
                .retain(|(t, u, _), _| !(*t == tenant_id && *u == user_id));
            state
                .user_grants
                .retain(|(t, u, _), _| !(*t == tenant_id && *u == user_id));
        }
        Ok(removed)
    }

    async fn insert_role(&self, role: RoleDefinition) -> StoreResult<()> {
        let mut state = self.write()?;
        if state
            .roles
            .values()
            .any(|r| r.tenant_id == role.tenant_id && r.name.matches(&role.name))
        {
            return Err(StoreError::Conflict(format!(
                "role '{}' already exists",
                role.name
            )));
        }
        state.roles.insert((role.tenant_id, role.id), role);
        Ok(())
    }

    async fn get_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> StoreResult<Option<RoleDefinition>> {
        Ok(self.read()?.roles.get(&(tenant_id, role_id)).cloned())
    }

    async fn role_by_name(
        &self,
        tenant_id: TenantId,
        name: &Role,
    ) -> StoreResult<Option<RoleDefinition>> {
        Ok(self
            .read()?
            .roles
            .values()
            .find(|r| r.tenant_id == tenant_id && r.name.matches(name))
            .cloned())
    }

    async fn list_roles(&self, tenant_id: TenantId) -> StoreResult<Vec<RoleDefinition>> {
        let roles = self
            .read()?
            .roles
            .values()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(sorted_by(roles, |r: &RoleDefinition| r.name.as_str().to_lowercase()))
    }

    async fn delete_role(&self, tenant_id: TenantId, role_id: RoleId) -> StoreResult<bool> {
        let mut state = self.write()?;
        let removed = state.roles.remove(&(tenant_id, role_id)).is_some();
        if removed {
            state
                .memberships
                .retain(|(t, _, r), _| !(*t == tenant_id && *r == role_id));
            state
                .role_grants
                .retain(|(t, r, _), _| !(*t == tenant_id && *r == role_id));
        }
        Ok(removed)
    }

    async fn insert_permission(&self, permission: PermissionDefinition) -> StoreResult<()> {
        let mut state = self.write()?;
        if state
            .permissions
            .values()
            .any(|p| p.tenant_id == permission.tenant_id && p.name == permission.name)
        {
            return Err(StoreError::Conflict(format!(
                "permission '{}' already exists",
                permission.name
            )));
        }
        state
            .permissions
            .insert((permission.tenant_id, permission.id), permission);
        Ok(())
    }

    async fn get_permission(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> StoreResult<Option<PermissionDefinition>> {
        Ok(self
            .read()?
            .permissions
            .get(&(tenant_id, permission_id))
            .cloned())
    }

    async fn permission_by_name(
        &self,
        tenant_id: TenantId,
        name: &Permission,
    ) -> StoreResult<Option<PermissionDefinition>> {
        Ok(self
            .read()?
            .permissions
            .values()
            .find(|p| p.tenant_id == tenant_id && &p.name == name)
            .cloned())
    }

    async fn list_permissions(&self, tenant_id: TenantId) -> StoreResult<Vec<PermissionDefinition>> {
        let permissions = self
            .read()?
            .permissions
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(sorted_by(permissions, |p: &PermissionDefinition| p.name.clone()))
    }

    async fn delete_permission(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> StoreResult<bool> {
        let mut state = self.write()?;
        let removed = state
            .permissions
            .remove(&(tenant_id, permission_id))
            .is_some();
        if removed {
            state
                .role_grants
                .retain(|(t, _, p), _| !(*t == tenant_id && *p == permission_id));
            state
                .user_grants
                .retain(|(t, _, p), _| !(*t == tenant_id && *p == permission_id));
        }
        Ok(removed)
    }

    async fn insert_membership(&self, membership: UserRoleMembership) -> StoreResult<()> {
        let mut state = self.write()?;
        let key = (membership.tenant_id, membership.user_id, membership.role_id);
        if state.memberships.contains_key(&key) {
            return Err(StoreError::Conflict("user already holds this role".to_string()));
        }
        state.memberships.insert(key, membership);
        Ok(())
    }

    async fn delete_membership(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        role_id: RoleId,
    ) -> StoreResult<bool> {
        Ok(self
            .write()?
            .memberships
            .remove(&(tenant_id, user_id, role_id))
            .is_some())
    }

    async fn roles_of_user(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<Vec<RoleId>> {
        let roles: BTreeSet<RoleId> = self
            .read()?
            .memberships
            .keys()
            .filter(|(t, u, _)| *t == tenant_id && *u == user_id)
            .map(|(_, _, r)| *r)
            .collect();
        Ok(roles.into_iter().collect())
    }

    async fn insert_role_grant(&self, grant: RolePermissionGrant) -> StoreResult<()> {
        let mut state = self.write()?;
        let key = (grant.tenant_id, grant.role_id, grant.permission_id);
        if state.role_grants.contains_key(&key) {
            return Err(StoreError::Conflict(
                "permission already granted to role".to_string(),
            ));
        }
        state.role_grants.insert(key, grant);
        Ok(())
    }

    async fn delete_role_grant(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<bool> {
        Ok(self
            .write()?
            .role_grants
            .remove(&(tenant_id, role_id, permission_id))
            .is_some())
    }

    async fn permissions_of_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> StoreResult<Vec<PermissionId>> {
        let permissions: BTreeSet<PermissionId> = self
            .read()?
            .role_grants
            .keys()
            .filter(|(t, r, _)| *t == tenant_id && *r == role_id)
            .map(|(_, _, p)| *p)
            .collect();
        Ok(permissions.into_iter().collect())
    }

    async fn insert_user_grant(&self, grant: UserPermissionGrant) -> StoreResult<()> {
        let mut state = self.write()?;
        let key = (grant.tenant_id, grant.user_id, grant.permission_id);
        if state.user_grants.contains_key(&key) {
            return Err(StoreError::Conflict(
                "permission already granted to user".to_string(),
            ));
        }
        state.user_grants.insert(key, grant);
        Ok(())
    }

    async fn delete_user_grant(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> StoreResult<bool> {
        Ok(self
            .write()?
            .user_grants
            .remove(&(tenant_id, user_id, permission_id))
            .is_some())
    }

    async fn direct_permissions_of_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> StoreResult<Vec<PermissionId>> {
        let permissions: BTreeSet<PermissionId> = self
            .read()?
            .user_grants
            .keys()
            .filter(|(t, u, _)| *t == tenant_id && *u == user_id)
            .map(|(_, _, p)| *p)
            .collect();
        Ok(permissions.into_iter().collect())
    }
}
