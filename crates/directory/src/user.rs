use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{DomainError, DomainResult, Entity, TenantId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UserStatus {
    #[default]
    Active,
    /// Holds no permissions and cannot receive new roles. Grants are kept
    /// so that reactivation restores them.
    Suspended,
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "Active"),
            UserStatus::Suspended => write!(f, "Suspended"),
        }
    }
}

/// A user account. Belongs to exactly one tenant for its whole life.
///
/// Role memberships are separate records ([`crate::UserRoleMembership`]) so
/// that the permission resolver reads a single source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub email: String,
    pub display_name: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        tenant_id: TenantId,
        email: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }

        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(DomainError::validation("display name cannot be empty"));
        }

        Ok(Self {
            id: UserId::new(),
            tenant_id,
            email: email.to_lowercase(),
            display_name: display_name.to_string(),
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn ensure_active(&self) -> DomainResult<()> {
        if self.status == UserStatus::Suspended {
            return Err(DomainError::invariant("user is suspended"));
        }
        Ok(())
    }

    pub fn suspend(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == UserStatus::Suspended {
            return Err(DomainError::invariant("user already suspended"));
        }
        self.status = UserStatus::Suspended;
        self.updated_at = now;
        Ok(())
    }

    pub fn activate(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == UserStatus::Active {
            return Err(DomainError::invariant("user already active"));
        }
        self.status = UserStatus::Active;
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
