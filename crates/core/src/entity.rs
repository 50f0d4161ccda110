//! Entity trait: identity + tenant ownership.

use crate::TenantId;

/// A directory record that has its own identity and lives in exactly one tenant.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> Self::Id;

    /// Owning tenant. Records never move between tenants.
    fn tenant_id(&self) -> TenantId;
}
