//! Directory persistence contract.
//!
//! The store is the single source of truth for tenants, users, roles,
//! permissions and the grants between them. Every lookup except tenant
//! administration is keyed by tenant, so one tenant's records are never
//! visible through another tenant's id.

mod in_memory;

pub use in_memory::InMemoryDirectoryStore;

use async_trait::async_trait;
use thiserror::Error;

use warden_auth::{Permission, Role};
use warden_core::{PermissionId, RoleId, TenantId, UserId};
use warden_directory::{
    PermissionDefinition, RoleDefinition, RolePermissionGrant, Tenant, User,
    UserPermissionGrant, UserRoleMembership,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store could not be read or written.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    // ── tenants ──────────────────────────────────────────────────────────────
    /// Fails with `Conflict` when the slug is taken.
    async fn insert_tenant(&self, tenant: Tenant) -> StoreResult<()>;
    async fn get_tenant(&self, tenant_id: TenantId) -> StoreResult<Option<Tenant>>;
    async fn list_tenants(&self) -> StoreResult<Vec<Tenant>>;

    // ── users ────────────────────────────────────────────────────────────────
    /// Fails with `Conflict` when the email is taken inside the tenant.
    async fn insert_user(&self, user: User) -> StoreResult<()>;
    async fn get_user(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<Option<User>>;
    async fn list_users(&self, tenant_id: TenantId) -> StoreResult<Vec<User>>;
    async fn update_user(&self, user: User) -> StoreResult<()>;
    /// Also drops the user's memberships and direct grants.
    async fn delete_user(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<bool>;

    // ── roles ────────────────────────────────────────────────────────────────
    /// Fails with `Conflict` when a role with the same name (ignoring case)
    /// exists inside the tenant.
    async fn insert_role(&self, role: RoleDefinition) -> StoreResult<()>;
    async fn get_role(&self, tenant_id: TenantId, role_id: RoleId)
    -> StoreResult<Option<RoleDefinition>>;
    async fn role_by_name(&self, tenant_id: TenantId, name: &Role)
    -> StoreResult<Option<RoleDefinition>>;
    async fn list_roles(&self, tenant_id: TenantId) -> StoreResult<Vec<RoleDefinition>>;
    /// Also drops memberships of the role and its permission grants.
    async fn delete_role(&self, tenant_id: TenantId, role_id: RoleId) -> StoreResult<bool>;

    // ── permissions ──────────────────────────────────────────────────────────
    /// Fails with `Conflict` when the name is taken inside the tenant.
    async fn insert_permission(&self, permission: PermissionDefinition) -> StoreResult<()>;
    async fn get_permission(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> StoreResult<Option<PermissionDefinition>>;
    async fn permission_by_name(
        &self,
        tenant_id: TenantId,
        name: &Permission,
    ) -> StoreResult<Option<PermissionDefinition>>;
    async fn list_permissions(&self, tenant_id: TenantId)
    -> StoreResult<Vec<PermissionDefinition>>;
    /// Also drops every grant of the permission.
    async fn delete_permission(
        &self,
        tenant_id: TenantId,
        permission_id: PermissionId,
    ) -> StoreResult<bool>;

    // ── grants ───────────────────────────────────────────────────────────────
    /// Fails with `Conflict` when the membership already exists.
    async fn insert_membership(&self, membership: UserRoleMembership) -> StoreResult<()>;
    async fn delete_membership(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        role_id: RoleId,
    ) -> StoreResult<bool>;
    async fn roles_of_user(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<Vec<RoleId>>;

    /// Fails with `Conflict` when the grant already exists.
    async fn insert_role_grant(&self, grant: RolePermissionGrant) -> StoreResult<()>;
    async fn delete_role_grant(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> StoreResult<bool>;
    async fn permissions_of_role(
        &self,
        tenant_id: TenantId,
        role_id: RoleId,
    ) -> StoreResult<Vec<PermissionId>>;

    /// Fails with `Conflict` when the grant already exists.
    async fn insert_user_grant(&self, grant: UserPermissionGrant) -> StoreResult<()>;
    async fn delete_user_grant(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        permission_id: PermissionId,
    ) -> StoreResult<bool>;
    async fn direct_permissions_of_user(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> StoreResult<Vec<PermissionId>>;
}
