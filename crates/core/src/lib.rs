//! `warden-core`: shared identity and error primitives.
//!
//! Nothing in here knows about HTTP, storage or authorization policy.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{PermissionId, RoleId, TenantId, UserId};
