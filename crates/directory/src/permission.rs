use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_auth::Permission;
use warden_core::{DomainError, DomainResult, Entity, PermissionId, TenantId};

/// A permission defined inside a tenant. Names are unique per tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinition {
    pub id: PermissionId,
    pub tenant_id: TenantId,
    pub name: Permission,
    pub resource: String,
    pub action: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl PermissionDefinition {
    /// Resource and action are taken from a `resource.action` name; names
    /// without a dot use the whole name as resource and `*` as action.
    pub fn new(
        tenant_id: TenantId,
        name: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("permission name cannot be empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(
                "permission name cannot contain whitespace",
            ));
        }

        let permission = Permission::new(name.to_string());
        let (resource, action) = permission
            .resource_and_action()
            .map(|(r, a)| (r.to_string(), a.to_string()))
            .unwrap_or_else(|| (name.to_string(), "*".to_string()));

        Ok(Self {
            id: PermissionId::new(),
            tenant_id,
            name: permission,
            resource,
            action,
            description: description.trim().to_string(),
            created_at: now,
        })
    }
}

impl Entity for PermissionDefinition {
    type Id = PermissionId;

    fn id(&self) -> PermissionId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
