//! Built-in roles and permissions.
//!
//! Every tenant is seeded with the system roles below. The permission names
//! are the ones the directory operations declare; nothing stops a tenant from
//! defining more.

use warden_auth::{Permission, Requirements, Role};

pub const SUPER_ADMIN: Role = Role::from_static("SuperAdmin");
pub const ADMIN: Role = Role::from_static("Admin");
pub const USER: Role = Role::from_static("User");

pub const TENANTS_READ: Permission = Permission::from_static("tenants.read");

pub const USERS_CREATE: Permission = Permission::from_static("users.create");
pub const USERS_READ: Permission = Permission::from_static("users.read");
pub const USERS_UPDATE: Permission = Permission::from_static("users.update");
pub const USERS_DELETE: Permission = Permission::from_static("users.delete");

pub const ROLES_READ: Permission = Permission::from_static("roles.read");
pub const ROLES_DELETE: Permission = Permission::from_static("roles.delete");
pub const ROLES_ASSIGN: Permission = Permission::from_static("roles.assign");

pub const PERMISSIONS_CREATE: Permission = Permission::from_static("permissions.create");
pub const PERMISSIONS_READ: Permission = Permission::from_static("permissions.read");
pub const PERMISSIONS_DELETE: Permission = Permission::from_static("permissions.delete");
pub const PERMISSIONS_ASSIGN: Permission = Permission::from_static("permissions.assign");

pub const ALL_PERMISSIONS: &[Permission] = &[
    TENANTS_READ,
    USERS_CREATE,
    USERS_READ,
    USERS_UPDATE,
    USERS_DELETE,
    ROLES_READ,
    ROLES_DELETE,
    ROLES_ASSIGN,
    PERMISSIONS_CREATE,
    PERMISSIONS_READ,
    PERMISSIONS_DELETE,
    PERMISSIONS_ASSIGN,
];

/// A system role and the catalog permissions it is granted at seed time.
#[derive(Debug, Clone)]
pub struct SystemRoleSeed {
    pub role: Role,
    pub description: &'static str,
    pub permissions: &'static [Permission],
}

pub const SYSTEM_ROLES: &[SystemRoleSeed] = &[
    SystemRoleSeed {
        role: ADMIN,
        description: "Tenant administrator",
        permissions: ALL_PERMISSIONS,
    },
    SystemRoleSeed {
        role: USER,
        description: "Regular tenant member",
        permissions: &[USERS_READ, ROLES_READ, PERMISSIONS_READ],
    },
];

/// Requirements shared by the role-administration operations.
pub fn admin_base() -> Requirements {
    Requirements::none().role(ADMIN)
}
