//! Links between users, roles and permissions. All links are tenant-scoped:
//! both ends live in `tenant_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{PermissionId, RoleId, TenantId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleMembership {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub role_id: RoleId,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionGrant {
    pub tenant_id: TenantId,
    pub role_id: RoleId,
    pub permission_id: PermissionId,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissionGrant {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub permission_id: PermissionId,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: UserId,
}
