use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_auth::Role;
use warden_core::{DomainError, DomainResult, Entity, RoleId, TenantId};

/// A named role defined inside a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub id: RoleId,
    pub tenant_id: TenantId,
    pub name: Role,
    pub description: String,
    /// Seeded by the platform; cannot be renamed or deleted.
    pub is_system_role: bool,
    pub created_at: DateTime<Utc>,
}

impl RoleDefinition {
    pub fn new(
        tenant_id: TenantId,
        name: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("role name cannot be empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("role name cannot contain whitespace"));
        }

        Ok(Self {
            id: RoleId::new(),
            tenant_id,
            name: Role::new(name.to_string()),
            description: description.trim().to_string(),
            is_system_role: false,
            created_at: now,
        })
    }

    pub fn system(tenant_id: TenantId, name: Role, description: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: RoleId::new(),
            tenant_id,
            name,
            description: description.to_string(),
            is_system_role: true,
            created_at: now,
        }
    }

    pub fn ensure_deletable(&self) -> DomainResult<()> {
        if self.is_system_role {
            return Err(DomainError::invariant(format!(
                "system role '{}' cannot be deleted",
                self.name
            )));
        }
        Ok(())
    }

    pub fn ensure_mutable_name(&self) -> DomainResult<()> {
        if self.is_system_role {
            return Err(DomainError::invariant(format!(
                "system role '{}' cannot be renamed",
                self.name
            )));
        }
        Ok(())
    }
}

impl Entity for RoleDefinition {
    type Id = RoleId;

    fn id(&self) -> RoleId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_roles_are_deletable() {
        let role = RoleDefinition::new(TenantId::new(), "Auditor", "reads audit logs", Utc::now()).unwrap();
        assert!(role.ensure_deletable().is_ok());
        assert!(role.ensure_mutable_name().is_ok());
    }

    #[test]
    fn system_roles_are_protected() {
        let role = RoleDefinition::system(TenantId::new(), Role::new("Admin"), "", Utc::now());
        assert!(matches!(role.ensure_deletable(), Err(DomainError::InvariantViolation(_))));
        assert!(role.ensure_mutable_name().is_err());
    }

    #[test]
    fn names_with_whitespace_are_rejected() {
        assert!(RoleDefinition::new(TenantId::new(), "Line Manager", "", Utc::now()).is_err());
        assert!(RoleDefinition::new(TenantId::new(), "  ", "", Utc::now()).is_err());
    }
}
