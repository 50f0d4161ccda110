use serde::Deserialize;

use warden_core::{PermissionId, RoleId};

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: RoleId,
}

#[derive(Debug, Deserialize)]
pub struct GrantPermissionRequest {
    pub permission_id: PermissionId,
}

/// Subject of `GET /authz/explain/:operation`. Without `user_id` the caller
/// is explained; roles are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct ExplainQuery {
    pub user_id: Option<String>,
    pub roles: Option<String>,
}
