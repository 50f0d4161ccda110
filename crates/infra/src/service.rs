//! Directory handlers.
//!
//! Every handler runs after the gate has admitted the caller. Handlers act
//! inside the caller's tenant only; tenant administration is the exception.
//! Successful writes publish a [`DirectoryEvent`] so permission caches can be
//! invalidated.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use warden_auth::RequestIdentity;
use warden_core::{DomainError, TenantId, UserId};
use warden_directory::catalog::{self, SYSTEM_ROLES};
use warden_directory::operations::{
    ActivateUser, AssignRoleToUser, CreatePermission, CreateRole, CreateTenant, CreateUser,
    DeletePermission, DeleteRole, DeleteUser, GetRole, GetTenant, GetUser, GrantPermissionToRole,
    GrantPermissionToUser, Health, HealthStatus, ListPermissions, ListRoles, ListTenants,
    ListUsers, RevokePermissionFromRole, RevokePermissionFromUser, RevokeRoleFromUser,
    SuspendUser, WhoAmI,
};
use warden_directory::{
    DirectoryEvent, PermissionDefinition, RoleDefinition, RolePermissionGrant, Tenant, User,
    UserPermissionGrant, UserRoleMembership,
};
use warden_events::{EventBus, EventEnvelope};

use crate::dispatcher::{DispatchError, OperationHandler};
use crate::store::DirectoryStore;

/// Result of [`DirectoryService::bootstrap_tenant`].
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub tenant: Tenant,
    pub admin: User,
}

pub struct DirectoryService<S, B> {
    store: Arc<S>,
    bus: B,
}

impl<S, B> DirectoryService<S, B> {
    pub fn new(store: Arc<S>, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> core::fmt::Debug for DirectoryService<S, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DirectoryService").finish_non_exhaustive()
    }
}

/// Tenant and acting user of an admitted request.
fn scope(identity: &RequestIdentity) -> Result<(TenantId, UserId), DispatchError> {
    let tenant_id = identity
        .tenant_id()
        .ok_or_else(|| DomainError::tenant_isolation("operation requires a tenant scope"))?;
    let actor = identity
        .user_id()
        .ok_or_else(|| DomainError::validation("operation requires an acting user"))?;
    Ok((tenant_id, actor))
}

fn actor(identity: &RequestIdentity) -> Result<UserId, DispatchError> {
    identity
        .user_id()
        .ok_or_else(|| DomainError::validation("operation requires an acting user").into())
}

impl<S, B> DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    fn publish(&self, event: DirectoryEvent) {
        let event_type = warden_events::Event::event_type(&event);
        let envelope = EventEnvelope::wrap(event.tenant_id(), event);
        if let Err(err) = self.bus.publish(envelope) {
            warn!(event_type, error = ?err, "directory event publication failed");
        }
    }

    async fn require_user(&self, tenant_id: TenantId, user_id: UserId) -> Result<User, DispatchError> {
        self.store
            .get_user(tenant_id, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {user_id}")).into())
    }

    async fn require_role(
        &self,
        tenant_id: TenantId,
        role_id: warden_core::RoleId,
    ) -> Result<RoleDefinition, DispatchError> {
        self.store
            .get_role(tenant_id, role_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("role {role_id}")).into())
    }

    async fn require_permission(
        &self,
        tenant_id: TenantId,
        permission_id: warden_core::PermissionId,
    ) -> Result<PermissionDefinition, DispatchError> {
        self.store
            .get_permission(tenant_id, permission_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("permission {permission_id}")).into())
    }

    /// Store a new tenant with the catalog permissions and the system roles
    /// granted to them.
    pub async fn seed_tenant(&self, tenant: Tenant, actor: UserId) -> Result<Tenant, DispatchError> {
        let tenant_id = tenant.id;
        let now = Utc::now();
        self.store.insert_tenant(tenant.clone()).await?;

        for name in catalog::ALL_PERMISSIONS {
            let definition = PermissionDefinition::new(tenant_id, name.as_str(), "", now)?;
            self.store.insert_permission(definition).await?;
        }

        for seed in SYSTEM_ROLES {
            let role = RoleDefinition::system(tenant_id, seed.role.clone(), seed.description, now);
            let role_id = role.id;
            self.store.insert_role(role).await?;

            for name in seed.permissions {
                let Some(definition) = self.store.permission_by_name(tenant_id, name).await? else {
                    continue;
                };
                self.store
                    .insert_role_grant(RolePermissionGrant {
                        tenant_id,
                        role_id,
                        permission_id: definition.id,
                        assigned_at: now,
                        assigned_by: actor,
                    })
                    .await?;
            }
        }

        info!(tenant_id = %tenant_id, slug = %tenant.slug, "tenant seeded");
        self.publish(DirectoryEvent::TenantCreated { tenant_id, at: now });
        Ok(tenant)
    }

    /// Create a seeded tenant plus an active user holding the `Admin` role.
    pub async fn bootstrap_tenant(
        &self,
        name: &str,
        slug: &str,
        admin_email: &str,
    ) -> Result<BootstrapReport, DispatchError> {
        let now = Utc::now();
        let tenant = Tenant::new(name, slug, now)?;
        let admin = User::new(tenant.id, admin_email, "Administrator", now)?;
        let tenant = self.seed_tenant(tenant, admin.id).await?;

        self.store.insert_user(admin.clone()).await?;
        let admin_role = self
            .store
            .role_by_name(tenant.id, &catalog::ADMIN)
            .await?
            .ok_or_else(|| DomainError::not_found("Admin role"))?;
        self.store
            .insert_membership(UserRoleMembership {
                tenant_id: tenant.id,
                user_id: admin.id,
                role_id: admin_role.id,
                assigned_at: now,
                assigned_by: admin.id,
            })
            .await?;

        Ok(BootstrapReport { tenant, admin })
    }
}

// ── System ───────────────────────────────────────────────────────────────────

#[async_trait]
impl<S, B> OperationHandler<Health> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, _identity: &RequestIdentity, _op: Health) -> Result<HealthStatus, DispatchError> {
        Ok(HealthStatus::ok())
    }
}

#[async_trait]
impl<S, B> OperationHandler<WhoAmI> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(
        &self,
        identity: &RequestIdentity,
        _op: WhoAmI,
    ) -> Result<RequestIdentity, DispatchError> {
        Ok(identity.clone())
    }
}

// ── Tenants ──────────────────────────────────────────────────────────────────

#[async_trait]
impl<S, B> OperationHandler<CreateTenant> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, identity: &RequestIdentity, op: CreateTenant) -> Result<Tenant, DispatchError> {
        let actor = actor(identity)?;
        let tenant = Tenant::new(&op.name, &op.slug, Utc::now())?;
        self.seed_tenant(tenant, actor).await
    }
}

#[async_trait]
impl<S, B> OperationHandler<GetTenant> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, identity: &RequestIdentity, op: GetTenant) -> Result<Tenant, DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        if op.tenant_id != tenant_id {
            return Err(DomainError::tenant_isolation("tenant outside request scope").into());
        }
        self.store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("tenant {tenant_id}")).into())
    }
}

#[async_trait]
impl<S, B> OperationHandler<ListTenants> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, _identity: &RequestIdentity, _op: ListTenants) -> Result<Vec<Tenant>, DispatchError> {
        Ok(self.store.list_tenants().await?)
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

#[async_trait]
impl<S, B> OperationHandler<CreateUser> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, identity: &RequestIdentity, op: CreateUser) -> Result<User, DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        let now = Utc::now();
        let user = User::new(tenant_id, &op.email, &op.display_name, now)?;
        self.store.insert_user(user.clone()).await?;

        info!(tenant_id = %tenant_id, user_id = %user.id, "user created");
        self.publish(DirectoryEvent::UserCreated {
            tenant_id,
            user_id: user.id,
            at: now,
        });
        Ok(user)
    }
}

#[async_trait]
impl<S, B> OperationHandler<GetUser> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, identity: &RequestIdentity, op: GetUser) -> Result<User, DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        self.require_user(tenant_id, op.user_id).await
    }
}

#[async_trait]
impl<S, B> OperationHandler<ListUsers> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, identity: &RequestIdentity, _op: ListUsers) -> Result<Vec<User>, DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        Ok(self.store.list_users(tenant_id).await?)
    }
}

#[async_trait]
impl<S, B> OperationHandler<SuspendUser> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, identity: &RequestIdentity, op: SuspendUser) -> Result<User, DispatchError> {
        let (tenant_id, actor) = scope(identity)?;
        if op.user_id == actor {
            return Err(DomainError::invariant("users cannot suspend themselves").into());
        }

        let now = Utc::now();
        let mut user = self.require_user(tenant_id, op.user_id).await?;
        user.suspend(now)?;
        self.store.update_user(user.clone()).await?;

        info!(tenant_id = %tenant_id, user_id = %user.id, "user suspended");
        self.publish(DirectoryEvent::UserSuspended {
            tenant_id,
            user_id: user.id,
            at: now,
        });
        Ok(user)
    }
}

#[async_trait]
impl<S, B> OperationHandler<ActivateUser> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, identity: &RequestIdentity, op: ActivateUser) -> Result<User, DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        let now = Utc::now();
        let mut user = self.require_user(tenant_id, op.user_id).await?;
        user.activate(now)?;
        self.store.update_user(user.clone()).await?;

        info!(tenant_id = %tenant_id, user_id = %user.id, "user activated");
        self.publish(DirectoryEvent::UserActivated {
            tenant_id,
            user_id: user.id,
            at: now,
        });
        Ok(user)
    }
}

#[async_trait]
impl<S, B> OperationHandler<DeleteUser> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, identity: &RequestIdentity, op: DeleteUser) -> Result<(), DispatchError> {
        let (tenant_id, actor) = scope(identity)?;
        if op.user_id == actor {
            return Err(DomainError::invariant("users cannot delete themselves").into());
        }
        if !self.store.delete_user(tenant_id, op.user_id).await? {
            return Err(DomainError::not_found(format!("user {}", op.user_id)).into());
        }

        info!(tenant_id = %tenant_id, user_id = %op.user_id, "user deleted");
        self.publish(DirectoryEvent::UserDeleted {
            tenant_id,
            user_id: op.user_id,
            at: Utc::now(),
        });
        Ok(())
    }
}

// ── Roles ────────────────────────────────────────────────────────────────────

#[async_trait]
impl<S, B> OperationHandler<CreateRole> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, identity: &RequestIdentity, op: CreateRole) -> Result<RoleDefinition, DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        let now = Utc::now();
        let role = RoleDefinition::new(tenant_id, &op.name, &op.description, now)?;
        self.store.insert_role(role.clone()).await?;

        info!(tenant_id = %tenant_id, role = %role.name, "role created");
        self.publish(DirectoryEvent::RoleCreated {
            tenant_id,
            role_id: role.id,
            at: now,
        });
        Ok(role)
    }
}

#[async_trait]
impl<S, B> OperationHandler<GetRole> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, identity: &RequestIdentity, op: GetRole) -> Result<RoleDefinition, DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        self.require_role(tenant_id, op.role_id).await
    }
}

#[async_trait]
impl<S, B> OperationHandler<ListRoles> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(
        &self,
        identity: &RequestIdentity,
        _op: ListRoles,
    ) -> Result<Vec<RoleDefinition>, DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        Ok(self.store.list_roles(tenant_id).await?)
    }
}

#[async_trait]
impl<S, B> OperationHandler<DeleteRole> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, identity: &RequestIdentity, op: DeleteRole) -> Result<(), DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        let role = self.require_role(tenant_id, op.role_id).await?;
        role.ensure_deletable()?;
        self.store.delete_role(tenant_id, role.id).await?;

        info!(tenant_id = %tenant_id, role = %role.name, "role deleted");
        self.publish(DirectoryEvent::RoleDeleted {
            tenant_id,
            role_id: role.id,
            at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl<S, B> OperationHandler<AssignRoleToUser> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(
        &self,
        identity: &RequestIdentity,
        op: AssignRoleToUser,
    ) -> Result<UserRoleMembership, DispatchError> {
        let (tenant_id, actor) = scope(identity)?;
        let user = self.require_user(tenant_id, op.user_id).await?;
        user.ensure_active()?;
        let role = self.require_role(tenant_id, op.role_id).await?;

        let membership = UserRoleMembership {
            tenant_id,
            user_id: user.id,
            role_id: role.id,
            assigned_at: Utc::now(),
            assigned_by: actor,
        };
        self.store.insert_membership(membership.clone()).await?;

        info!(tenant_id = %tenant_id, user_id = %user.id, role = %role.name, "role assigned");
        self.publish(DirectoryEvent::RoleAssigned {
            tenant_id,
            user_id: user.id,
            role_id: role.id,
            at: membership.assigned_at,
        });
        Ok(membership)
    }
}

#[async_trait]
impl<S, B> OperationHandler<RevokeRoleFromUser> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, identity: &RequestIdentity, op: RevokeRoleFromUser) -> Result<(), DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        if !self
            .store
            .delete_membership(tenant_id, op.user_id, op.role_id)
            .await?
        {
            return Err(DomainError::not_found("role membership").into());
        }

        info!(tenant_id = %tenant_id, user_id = %op.user_id, role_id = %op.role_id, "role revoked");
        self.publish(DirectoryEvent::RoleRevoked {
            tenant_id,
            user_id: op.user_id,
            role_id: op.role_id,
            at: Utc::now(),
        });
        Ok(())
    }
}

// ── Permissions ──────────────────────────────────────────────────────────────

#[async_trait]
impl<S, B> OperationHandler<CreatePermission> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(
        &self,
        identity: &RequestIdentity,
        op: CreatePermission,
    ) -> Result<PermissionDefinition, DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        let now = Utc::now();
        let permission = PermissionDefinition::new(tenant_id, &op.name, &op.description, now)?;
        self.store.insert_permission(permission.clone()).await?;

        info!(tenant_id = %tenant_id, permission = %permission.name, "permission created");
        self.publish(DirectoryEvent::PermissionCreated {
            tenant_id,
            permission_id: permission.id,
            at: now,
        });
        Ok(permission)
    }
}

#[async_trait]
impl<S, B> OperationHandler<ListPermissions> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(
        &self,
        identity: &RequestIdentity,
        _op: ListPermissions,
    ) -> Result<Vec<PermissionDefinition>, DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        Ok(self.store.list_permissions(tenant_id).await?)
    }
}

#[async_trait]
impl<S, B> OperationHandler<DeletePermission> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(&self, identity: &RequestIdentity, op: DeletePermission) -> Result<(), DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        if !self
            .store
            .delete_permission(tenant_id, op.permission_id)
            .await?
        {
            return Err(DomainError::not_found(format!("permission {}", op.permission_id)).into());
        }

        info!(tenant_id = %tenant_id, permission_id = %op.permission_id, "permission deleted");
        self.publish(DirectoryEvent::PermissionDeleted {
            tenant_id,
            permission_id: op.permission_id,
            at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl<S, B> OperationHandler<GrantPermissionToRole> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(
        &self,
        identity: &RequestIdentity,
        op: GrantPermissionToRole,
    ) -> Result<RolePermissionGrant, DispatchError> {
        let (tenant_id, actor) = scope(identity)?;
        let role = self.require_role(tenant_id, op.role_id).await?;
        let permission = self.require_permission(tenant_id, op.permission_id).await?;

        let grant = RolePermissionGrant {
            tenant_id,
            role_id: role.id,
            permission_id: permission.id,
            assigned_at: Utc::now(),
            assigned_by: actor,
        };
        self.store.insert_role_grant(grant.clone()).await?;

        info!(tenant_id = %tenant_id, role = %role.name, permission = %permission.name, "permission granted to role");
        self.publish(DirectoryEvent::PermissionGrantedToRole {
            tenant_id,
            role_id: role.id,
            permission_id: permission.id,
            at: grant.assigned_at,
        });
        Ok(grant)
    }
}

#[async_trait]
impl<S, B> OperationHandler<RevokePermissionFromRole> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(
        &self,
        identity: &RequestIdentity,
        op: RevokePermissionFromRole,
    ) -> Result<(), DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        if !self
            .store
            .delete_role_grant(tenant_id, op.role_id, op.permission_id)
            .await?
        {
            return Err(DomainError::not_found("role permission grant").into());
        }

        info!(tenant_id = %tenant_id, role_id = %op.role_id, permission_id = %op.permission_id, "permission revoked from role");
        self.publish(DirectoryEvent::PermissionRevokedFromRole {
            tenant_id,
            role_id: op.role_id,
            permission_id: op.permission_id,
            at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl<S, B> OperationHandler<GrantPermissionToUser> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(
        &self,
        identity: &RequestIdentity,
        op: GrantPermissionToUser,
    ) -> Result<UserPermissionGrant, DispatchError> {
        let (tenant_id, actor) = scope(identity)?;
        let user = self.require_user(tenant_id, op.user_id).await?;
        let permission = self.require_permission(tenant_id, op.permission_id).await?;

        let grant = UserPermissionGrant {
            tenant_id,
            user_id: user.id,
            permission_id: permission.id,
            assigned_at: Utc::now(),
            assigned_by: actor,
        };
        self.store.insert_user_grant(grant.clone()).await?;

        info!(tenant_id = %tenant_id, user_id = %user.id, permission = %permission.name, "permission granted to user");
        self.publish(DirectoryEvent::PermissionGrantedToUser {
            tenant_id,
            user_id: user.id,
            permission_id: permission.id,
            at: grant.assigned_at,
        });
        Ok(grant)
    }
}

#[async_trait]
impl<S, B> OperationHandler<RevokePermissionFromUser> for DirectoryService<S, B>
where
    S: DirectoryStore,
    B: EventBus<EventEnvelope<DirectoryEvent>>,
{
    async fn handle(
        &self,
        identity: &RequestIdentity,
        op: RevokePermissionFromUser,
    ) -> Result<(), DispatchError> {
        let (tenant_id, _) = scope(identity)?;
        if !self
            .store
            .delete_user_grant(tenant_id, op.user_id, op.permission_id)
            .await?
        {
            return Err(DomainError::not_found("user permission grant").into());
        }

        info!(tenant_id = %tenant_id, user_id = %op.user_id, permission_id = %op.permission_id, "permission revoked from user");
        self.publish(DirectoryEvent::PermissionRevokedFromUser {
            tenant_id,
            user_id: op.user_id,
            permission_id: op.permission_id,
            at: Utc::now(),
        });
        Ok(())
    }
}
