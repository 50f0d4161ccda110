use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{DomainError, DomainResult, Entity, TenantId};

/// An isolation boundary. Every other directory record belongs to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    /// URL-safe handle, unique across the platform.
    pub slug: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(name: &str, slug: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("tenant name cannot be empty"));
        }

        let slug = slug.trim().to_lowercase();
        if slug.is_empty()
            || !slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(DomainError::validation(
                "tenant slug must be non-empty and contain only [a-z0-9-]",
            ));
        }

        Ok(Self {
            id: TenantId::new(),
            name: name.to_string(),
            slug,
            active: true,
            created_at: now,
        })
    }
}

impl Entity for Tenant {
    type Id = TenantId;

    fn id(&self) -> TenantId {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.id
    }
}
