use serde::Serialize;

use warden_core::{TenantId, UserId};

use crate::Role;

/// Who is calling, in which tenant, holding which roles.
///
/// Built once per inbound operation by the transport layer and handed to the
/// gate by reference. Nothing in the pipeline mutates it, and it is never
/// stored beyond the request that created it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestIdentity {
    user_id: Option<UserId>,
    tenant_id: Option<TenantId>,
    roles: Vec<Role>,
}

impl RequestIdentity {
    pub fn new(user_id: Option<UserId>, tenant_id: Option<TenantId>, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            tenant_id,
            roles,
        }
    }

    /// No identity and no tenant scope.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: UserId, tenant_id: TenantId, roles: Vec<Role>) -> Self {
        Self::new(Some(user_id), Some(tenant_id), roles)
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The first held role that matches any of `required` (case-insensitive).
    pub fn first_matching_role<'a>(&'a self, required: &[Role]) -> Option<&'a Role> {
        self.roles
            .iter()
            .find(|held| required.iter().any(|r| r.matches(held)))
    }
}
