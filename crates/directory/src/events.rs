use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{PermissionId, RoleId, TenantId, UserId};
use warden_events::Event;

/// Directory changes published after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DirectoryEvent {
    TenantCreated {
        tenant_id: TenantId,
        at: DateTime<Utc>,
    },
    UserCreated {
        tenant_id: TenantId,
        user_id: UserId,
        at: DateTime<Utc>,
    },
    UserSuspended {
        tenant_id: TenantId,
        user_id: UserId,
        at: DateTime<Utc>,
    },
    UserActivated {
        tenant_id: TenantId,
        user_id: UserId,
        at: DateTime<Utc>,
    },
    UserDeleted {
        tenant_id: TenantId,
        user_id: UserId,
        at: DateTime<Utc>,
    },
    RoleCreated {
        tenant_id: TenantId,
        role_id: RoleId,
        at: DateTime<Utc>,
    },
    RoleDeleted {
        tenant_id: TenantId,
        role_id: RoleId,
        at: DateTime<Utc>,
    },
    RoleAssigned {
        tenant_id: TenantId,
        user_id: UserId,
        role_id: RoleId,
        at: DateTime<Utc>,
    },
    RoleRevoked {
        tenant_id: TenantId,
        user_id: UserId,
        role_id: RoleId,
        at: DateTime<Utc>,
    },
    PermissionCreated {
        tenant_id: TenantId,
        permission_id: PermissionId,
        at: DateTime<Utc>,
    },
    PermissionDeleted {
        tenant_id: TenantId,
        permission_id: PermissionId,
        at: DateTime<Utc>,
    },
    PermissionGrantedToRole {
        tenant_id: TenantId,
        role_id: RoleId,
        permission_id: PermissionId,
        at: DateTime<Utc>,
    },
    PermissionRevokedFromRole {
        tenant_id: TenantId,
        role_id: RoleId,
        permission_id: PermissionId,
        at: DateTime<Utc>,
    },
    PermissionGrantedToUser {
        tenant_id: TenantId,
        user_id: UserId,
        permission_id: PermissionId,
        at: DateTime<Utc>,
    },
    PermissionRevokedFromUser {
        tenant_id: TenantId,
        user_id: UserId,
        permission_id: PermissionId,
        at: DateTime<Utc>,
    },
}

/// Which cached permission answers an event can make wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
    Nothing,
    User { tenant_id: TenantId, user_id: UserId },
    Tenant(TenantId),
}

impl DirectoryEvent {
    pub fn tenant_id(&self) -> TenantId {
        match self {
            DirectoryEvent::TenantCreated { tenant_id, .. }
            | DirectoryEvent::UserCreated { tenant_id, .. }
            | DirectoryEvent::UserSuspended { tenant_id, .. }
            | DirectoryEvent::UserActivated { tenant_id, .. }
            | DirectoryEvent::UserDeleted { tenant_id, .. }
            | DirectoryEvent::RoleCreated { tenant_id, .. }
            | DirectoryEvent::RoleDeleted { tenant_id, .. }
            | DirectoryEvent::RoleAssigned { tenant_id, .. }
            | DirectoryEvent::RoleRevoked { tenant_id, .. }
            | DirectoryEvent::PermissionCreated { tenant_id, .. }
            | DirectoryEvent::PermissionDeleted { tenant_id, .. }
            | DirectoryEvent::PermissionGrantedToRole { tenant_id, .. }
            | DirectoryEvent::PermissionRevokedFromRole { tenant_id, .. }
            | DirectoryEvent::PermissionGrantedToUser { tenant_id, .. }
            | DirectoryEvent::PermissionRevokedFromUser { tenant_id, .. } => *tenant_id,
        }
    }

    /// Creations cannot change an existing answer. Changes to one user's
    /// status, roles or direct grants affect that user only; changes to a
    /// role or permission definition can affect anyone in the tenant.
    pub fn invalidation_scope(&self) -> InvalidationScope {
        match self {
            DirectoryEvent::TenantCreated { .. }
            | DirectoryEvent::UserCreated { .. }
            | DirectoryEvent::RoleCreated { .. }
            | DirectoryEvent::PermissionCreated { .. } => InvalidationScope::Nothing,

            DirectoryEvent::UserSuspended { tenant_id, user_id, .. }
            | DirectoryEvent::UserActivated { tenant_id, user_id, .. }
            | DirectoryEvent::UserDeleted { tenant_id, user_id, .. }
            | DirectoryEvent::RoleAssigned { tenant_id, user_id, .. }
            | DirectoryEvent::RoleRevoked { tenant_id, user_id, .. }
            | DirectoryEvent::PermissionGrantedToUser { tenant_id, user_id, .. }
            | DirectoryEvent::PermissionRevokedFromUser { tenant_id, user_id, .. } => {
                InvalidationScope::User {
                    tenant_id: *tenant_id,
                    user_id: *user_id,
                }
            }

            DirectoryEvent::RoleDeleted { tenant_id, .. }
            | DirectoryEvent::PermissionDeleted { tenant_id, .. }
            | DirectoryEvent::PermissionGrantedToRole { tenant_id, .. }
            | DirectoryEvent::PermissionRevokedFromRole { tenant_id, .. } => {
                InvalidationScope::Tenant(*tenant_id)
            }
        }
    }
}

impl Event for DirectoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DirectoryEvent::TenantCreated { .. } => "directory.tenant.created",
            DirectoryEvent::UserCreated { .. } => "directory.user.created",
            DirectoryEvent::UserSuspended { .. } => "directory.user.suspended",
            DirectoryEvent::UserActivated { .. } => "directory.user.activated",
            DirectoryEvent::UserDeleted { .. } => "directory.user.deleted",
            DirectoryEvent::RoleCreated { .. } => "directory.role.created",
            DirectoryEvent::RoleDeleted { .. } => "directory.role.deleted",
            DirectoryEvent::RoleAssigned { .. } => "directory.role.assigned",
            DirectoryEvent::RoleRevoked { .. } => "directory.role.revoked",
            DirectoryEvent::PermissionCreated { .. } => "directory.permission.created",
            DirectoryEvent::PermissionDeleted { .. } => "directory.permission.deleted",
            DirectoryEvent::PermissionGrantedToRole { .. } => "directory.permission.granted_to_role",
            DirectoryEvent::PermissionRevokedFromRole { .. } => {
                "directory.permission.revoked_from_role"
            }
            DirectoryEvent::PermissionGrantedToUser { .. } => "directory.permission.granted_to_user",
            DirectoryEvent::PermissionRevokedFromUser { .. } => {
                "directory.permission.revoked_from_user"
            }
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DirectoryEvent::TenantCreated { at, .. }
            | DirectoryEvent::UserCreated { at, .. }
            | DirectoryEvent::UserSuspended { at, .. }
            | DirectoryEvent::UserActivated { at, .. }
            | DirectoryEvent::UserDeleted { at, .. }
            | DirectoryEvent::RoleCreated { at, .. }
            | DirectoryEvent::RoleDeleted { at, .. }
            | DirectoryEvent::RoleAssigned { at, .. }
            | DirectoryEvent::RoleRevoked { at, .. }
            | DirectoryEvent::PermissionCreated { at, .. }
            | DirectoryEvent::PermissionDeleted { at, .. }
            | DirectoryEvent::PermissionGrantedToRole { at, .. }
            | DirectoryEvent::PermissionRevokedFromRole { at, .. }
            | DirectoryEvent::PermissionGrantedToUser { at, .. }
            | DirectoryEvent::PermissionRevokedFromUser { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_level_changes_are_user_scoped() {
        let tenant_id = TenantId::new();
        let user_id = UserId::new();
        let event = DirectoryEvent::RoleRevoked {
            tenant_id,
            user_id,
            role_id: RoleId::new(),
            at: Utc::now(),
        };
        assert_eq!(
            event.invalidation_scope(),
            InvalidationScope::User { tenant_id, user_id }
        );
        assert_eq!(event.event_type(), "directory.role.revoked");
    }

    #[test]
    fn role_level_changes_are_tenant_scoped() {
        let tenant_id = TenantId::new();
        let event = DirectoryEvent::PermissionRevokedFromRole {
            tenant_id,
            role_id: RoleId::new(),
            permission_id: PermissionId::new(),
            at: Utc::now(),
        };
        assert_eq!(event.invalidation_scope(), InvalidationScope::Tenant(tenant_id));
    }

    #[test]
    fn creations_invalidate_nothing() {
        let event = DirectoryEvent::UserCreated {
            tenant_id: TenantId::new(),
            user_id: UserId::new(),
            at: Utc::now(),
        };
        assert_eq!(event.invalidation_scope(), InvalidationScope::Nothing);
    }
}
