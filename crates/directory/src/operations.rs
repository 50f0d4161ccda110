//! Administrative operations and their declared requirements.
//!
//! Each type is the input of one command or query. The names double as the
//! operation registry keys and the `operation` field in authorization logs.

use serde::{Deserialize, Serialize};

use warden_auth::{
    AuthorizationExplanation, Operation, OperationRegistry, RegistryError, RequestIdentity,
    Requirements,
};
use warden_core::{PermissionId, RoleId, TenantId, UserId};

use crate::catalog::{self, admin_base};
use crate::{
    PermissionDefinition, RoleDefinition, RolePermissionGrant, Tenant, User,
    UserPermissionGrant, UserRoleMembership,
};

macro_rules! declare_operation {
    ($ty:ty, $name:literal, $output:ty, $requirements:expr) => {
        impl Operation for $ty {
            const NAME: &'static str = $name;
            type Output = $output;

            fn requirements() -> Requirements {
                $requirements
            }
        }
    };
}

// ── System ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Health;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}

declare_operation!(Health, "system.health", HealthStatus, Requirements::anonymous());

/// Echoes the caller's identity; anonymous callers get an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhoAmI;

declare_operation!(WhoAmI, "system.whoami", RequestIdentity, Requirements::none());

/// Walk the gate for `operation` on behalf of `subject` without running it.
#[derive(Debug, Clone)]
pub struct ExplainDecision {
    pub operation: String,
    pub subject: RequestIdentity,
}

declare_operation!(
    ExplainDecision,
    "authz.explain",
    AuthorizationExplanation,
    admin_base()
);

// ── Tenants ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub slug: String,
}

declare_operation!(
    CreateTenant,
    "tenants.create",
    Tenant,
    Requirements::none().role(catalog::SUPER_ADMIN)
);

#[derive(Debug, Clone, Deserialize)]
pub struct GetTenant {
    pub tenant_id: TenantId,
}

declare_operation!(
    GetTenant,
    "tenants.get",
    Tenant,
    Requirements::none().permission(catalog::TENANTS_READ)
);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTenants;

declare_operation!(
    ListTenants,
    "tenants.list",
    Vec<Tenant>,
    Requirements::none().role(catalog::SUPER_ADMIN)
);

// ── Users ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub display_name: String,
}

declare_operation!(
    CreateUser,
    "users.create",
    User,
    Requirements::none().permission(catalog::USERS_CREATE)
);

#[derive(Debug, Clone, Deserialize)]
pub struct GetUser {
    pub user_id: UserId,
}

declare_operation!(
    GetUser,
    "users.get",
    User,
    Requirements::none().permission(catalog::USERS_READ)
);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsers;

declare_operation!(
    ListUsers,
    "users.list",
    Vec<User>,
    Requirements::none().permission(catalog::USERS_READ)
);

#[derive(Debug, Clone, Deserialize)]
pub struct SuspendUser {
    pub user_id: UserId,
}

declare_operation!(
    SuspendUser,
    "users.suspend",
    User,
    Requirements::none().permission(catalog::USERS_UPDATE)
);

#[derive(Debug, Clone, Deserialize)]
pub struct ActivateUser {
    pub user_id: UserId,
}

declare_operation!(
    ActivateUser,
    "users.activate",
    User,
    Requirements::none().permission(catalog::USERS_UPDATE)
);

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteUser {
    pub user_id: UserId,
}

declare_operation!(
    DeleteUser,
    "users.delete",
    (),
    Requirements::none().permission(catalog::USERS_DELETE)
);

// ── Roles ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRole {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

declare_operation!(CreateRole, "roles.create", RoleDefinition, admin_base());

#[derive(Debug, Clone, Deserialize)]
pub struct GetRole {
    pub role_id: RoleId,
}

declare_operation!(
    GetRole,
    "roles.get",
    RoleDefinition,
    Requirements::none().permission(catalog::ROLES_READ)
);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRoles;

declare_operation!(
    ListRoles,
    "roles.list",
    Vec<RoleDefinition>,
    Requirements::none().permission(catalog::ROLES_READ)
);

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteRole {
    pub role_id: RoleId,
}

declare_operation!(
    DeleteRole,
    "roles.delete",
    (),
    Requirements::none()
        .include(&admin_base())
        .permission(catalog::ROLES_DELETE)
);

#[derive(Debug, Clone, Deserialize)]
pub struct AssignRoleToUser {
    pub user_id: UserId,
    pub role_id: RoleId,
}

declare_operation!(
    AssignRoleToUser,
    "roles.assign",
    UserRoleMembership,
    Requirements::none()
        .include(&admin_base())
        .permission(catalog::ROLES_ASSIGN)
);

#[derive(Debug, Clone, Deserialize)]
pub struct RevokeRoleFromUser {
    pub user_id: UserId,
    pub role_id: RoleId,
}

declare_operation!(
    RevokeRoleFromUser,
    "roles.revoke",
    (),
    Requirements::none()
        .include(&admin_base())
        .permission(catalog::ROLES_ASSIGN)
);

// ── Permissions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePermission {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

declare_operation!(
    CreatePermission,
    "permissions.create",
    PermissionDefinition,
    Requirements::none().permission(catalog::PERMISSIONS_CREATE)
);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPermissions;

declare_operation!(
    ListPermissions,
    "permissions.list",
    Vec<PermissionDefinition>,
    Requirements::none().permission(catalog::PERMISSIONS_READ)
);

#[derive(Debug, Clone, Deserialize)]
pub struct DeletePermission {
    pub permission_id: PermissionId,
}

declare_operation!(
    DeletePermission,
    "permissions.delete",
    (),
    Requirements::none().permission(catalog::PERMISSIONS_DELETE)
);

#[derive(Debug, Clone, Deserialize)]
pub struct GrantPermissionToRole {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}

declare_operation!(
    GrantPermissionToRole,
    "permissions.grant_to_role",
    RolePermissionGrant,
    Requirements::none().permission(catalog::PERMISSIONS_ASSIGN)
);

#[derive(Debug, Clone, Deserialize)]
pub struct RevokePermissionFromRole {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
}

declare_operation!(
    RevokePermissionFromRole,
    "permissions.revoke_from_role",
    (),
    Requirements::none().permission(catalog::PERMISSIONS_ASSIGN)
);

#[derive(Debug, Clone, Deserialize)]
pub struct GrantPermissionToUser {
    pub user_id: UserId,
    pub permission_id: PermissionId,
}

declare_operation!(
    GrantPermissionToUser,
    "permissions.grant_to_user",
    UserPermissionGrant,
    Requirements::none().permission(catalog::PERMISSIONS_ASSIGN)
);

#[derive(Debug, Clone, Deserialize)]
pub struct RevokePermissionFromUser {
    pub user_id: UserId,
    pub permission_id: PermissionId,
}

declare_operation!(
    RevokePermissionFromUser,
    "permissions.revoke_from_user",
    (),
    Requirements::none().permission(catalog::PERMISSIONS_ASSIGN)
);

/// Registry holding every directory operation.
pub fn operation_registry() -> Result<OperationRegistry, RegistryError> {
    OperationRegistry::builder()
        .register::<Health>()
        .register::<WhoAmI>()
        .register::<ExplainDecision>()
        .register::<CreateTenant>()
        .register::<GetTenant>()
        .register::<ListTenants>()
        .register::<CreateUser>()
        .register::<GetUser>()
        .register::<ListUsers>()
        .register::<SuspendUser>()
        .register::<ActivateUser>()
        .register::<DeleteUser>()
        .register::<CreateRole>()
        .register::<GetRole>()
        .register::<ListRoles>()
        .register::<DeleteRole>()
        .register::<AssignRoleToUser>()
        .register::<RevokeRoleFromUser>()
        .register::<CreatePermission>()
        .register::<ListPermissions>()
        .register::<DeletePermission>()
        .register::<GrantPermissionToRole>()
        .register::<RevokePermissionFromRole>()
        .register::<GrantPermissionToUser>()
        .register::<RevokePermissionFromUser>()
        .build()
}
